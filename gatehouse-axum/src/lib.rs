//! # Gatehouse Axum Integration
//!
//! Middleware and extractors that put the gatehouse policies in front of an Axum
//! application.
//!
//! - [`session_guard`]: classifies each request path, redirects visitors without a
//!   live session away from protected pages and signed-in visitors away from the
//!   login pages, and refreshes the session metadata cookie on every live request.
//! - [`login_rate_limit`]: counts login submissions per client and answers
//!   `429 Too Many Requests` with a `Retry-After` header once the client is locked out.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum::{Router, routing::{get, post}};
//! use gatehouse::{Gatehouse, GatehouseConfig};
//! use gatehouse_axum::{LiveSession, layers};
//!
//! #[tokio::main]
//! async fn main() {
//!     let gatehouse = Arc::new(
//!         Gatehouse::builder()
//!             .with_in_memory_store()
//!             .with_config(GatehouseConfig::from_env())
//!             .build()
//!             .unwrap(),
//!     );
//!     let layers = layers(gatehouse);
//!
//!     let login = layers.limit_logins(Router::new().route("/login", post(login_handler)));
//!     let app = layers.guard(
//!         Router::new()
//!             .route("/dashboard", get(dashboard_handler))
//!             .merge(login),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//!
//! async fn login_handler() -> &'static str {
//!     "credentials checked here"
//! }
//!
//! async fn dashboard_handler(LiveSession(session): LiveSession) -> String {
//!     format!("last active at {}", session.last_activity)
//! }
//! ```

mod context;
mod error;
mod extractors;
mod middleware;
mod types;

pub use context::{AxumSessionContext, clear_session, establish_session};
pub use error::{AuthError, Result};
pub use middleware::{GatehouseState, login_rate_limit, session_guard};
pub use types::{
    ClientIdentifier, LiveSession, LoginRequest, MessageResponse, OptionalLiveSession,
    RequestDeviceHeaders, SessionResponse,
};

use std::sync::Arc;

use axum::Router;
use gatehouse::{AttemptRepository, Gatehouse};

/// Prepare the gatehouse middleware for an application router.
///
/// # Arguments
///
/// * `gatehouse` - An Arc-wrapped Gatehouse shared with your handlers
pub fn layers<R>(gatehouse: Arc<Gatehouse<R>>) -> GatehouseLayers<R>
where
    R: AttemptRepository,
{
    GatehouseLayers {
        state: GatehouseState::new(gatehouse),
    }
}

/// Applies the gatehouse middleware to routers.
pub struct GatehouseLayers<R: AttemptRepository> {
    state: GatehouseState<R>,
}

impl<R: AttemptRepository> GatehouseLayers<R> {
    pub fn state(&self) -> GatehouseState<R> {
        self.state.clone()
    }

    /// Wrap every route of `router` in [`session_guard`].
    pub fn guard<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            session_guard::<R>,
        ))
    }

    /// Wrap the routes of `router` in [`login_rate_limit`].
    ///
    /// Pass a router holding only the login submission route.
    pub fn limit_logins<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.route_layer(axum::middleware::from_fn_with_state(
            self.state.clone(),
            login_rate_limit::<R>,
        ))
    }
}
