//! # Gatehouse
//!
//! Gatehouse provides the two request-time policies a server-rendered web application
//! needs when identity and data live in a hosted backend:
//!
//! - a **login attempt governor** that locks an identifier out for 30 minutes after
//!   more than 5 attempts within a 15 minute window, and
//! - a **session liveness validator** that keeps a small metadata cookie alive
//!   while the same device keeps making requests, and lets it lapse after 30 idle
//!   minutes.
//!
//! Route classification decides which requests the session check applies to.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gatehouse::{Gatehouse, GatehouseConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gatehouse = Gatehouse::builder()
//!         .with_in_memory_store()
//!         .with_config(GatehouseConfig::from_env())
//!         .build()?;
//!
//!     let decision = gatehouse.check_rate_limit("user@example.com").await?;
//!     assert!(decision.allowed);
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

pub mod builder;
pub mod config;

pub use builder::{GatehouseBuilder, GatehouseBuilderError, NoStore, WithStore};
pub use config::{Environment, GatehouseConfig};

/// Re-export core types from gatehouse_core
///
/// These types are commonly used when working with the Gatehouse API.
pub use gatehouse_core::{
    AttemptRecord, AttemptRepository, Clock, CookieSameSite, CookieSettings, DeviceHeaders,
    InMemoryAttemptRepository, RateLimitConfig, RateLimitDecision, RouteClass, RouteTable,
    SessionCheck, SessionConfig, SessionContext, SessionCookie, SessionMetadata, SystemClock,
};

#[cfg(feature = "test-helpers")]
pub use gatehouse_core::MockClock;

use gatehouse_core::{LoginRateLimitService, SessionLivenessService};

/// Errors that can occur when using Gatehouse.
#[derive(Debug, thiserror::Error)]
pub enum GatehouseError {
    /// The attempt store failed
    #[error("Storage error: {0}")]
    StorageError(String),
    /// Session metadata could not be written
    #[error("Session error: {0}")]
    SessionError(String),
    /// Configuration was rejected
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<gatehouse_core::Error> for GatehouseError {
    fn from(err: gatehouse_core::Error) -> Self {
        match err {
            gatehouse_core::Error::Storage(e) => GatehouseError::StorageError(e.to_string()),
            gatehouse_core::Error::Session(e) => GatehouseError::SessionError(e.to_string()),
            gatehouse_core::Error::Validation(e) => {
                GatehouseError::ConfigurationError(e.to_string())
            }
        }
    }
}

/// The coordinator for both request-time policies.
///
/// `Gatehouse` owns the login attempt governor, the session liveness validator and
/// the route table, and shares one clock between them. Wrap it in an `Arc` and hand
/// it to your request middleware.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use gatehouse::{Gatehouse, InMemoryAttemptRepository, RouteClass};
///
/// let gatehouse = Gatehouse::new(Arc::new(InMemoryAttemptRepository::new()));
/// assert_eq!(gatehouse.classify_route("/dashboard"), RouteClass::Protected);
/// ```
pub struct Gatehouse<R: AttemptRepository = InMemoryAttemptRepository> {
    rate_limit_service: Arc<LoginRateLimitService<R>>,
    session_service: Arc<SessionLivenessService>,
    routes: RouteTable,
    config: GatehouseConfig,
}

impl Gatehouse<InMemoryAttemptRepository> {
    /// Start building a Gatehouse instance.
    pub fn builder() -> GatehouseBuilder<NoStore> {
        GatehouseBuilder::new()
    }
}

impl<R: AttemptRepository> Gatehouse<R> {
    /// Create a Gatehouse with default policies over `repository`.
    ///
    /// Cookies are marked `Secure`; use the builder with
    /// [`GatehouseConfig::from_env`] for environment-dependent settings.
    pub fn new(repository: Arc<R>) -> Self {
        Self::from_parts(
            repository,
            GatehouseConfig::default(),
            RouteTable::default(),
            Arc::new(SystemClock),
        )
    }

    pub(crate) fn from_parts(
        repository: Arc<R>,
        config: GatehouseConfig,
        routes: RouteTable,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rate_limit_service = Arc::new(LoginRateLimitService::with_clock(
            repository,
            config.rate_limit.clone(),
            Arc::clone(&clock),
        ));
        let session_service = Arc::new(SessionLivenessService::with_clock(
            config.session.clone(),
            clock,
        ));

        Self {
            rate_limit_service,
            session_service,
            routes,
            config,
        }
    }

    pub fn config(&self) -> &GatehouseConfig {
        &self.config
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// The underlying login attempt governor
    pub fn rate_limiter(&self) -> &LoginRateLimitService<R> {
        &self.rate_limit_service
    }

    /// The underlying session liveness validator
    pub fn sessions(&self) -> &SessionLivenessService {
        &self.session_service
    }

    /// Register a login attempt for `identifier`.
    ///
    /// # Arguments
    ///
    /// * `identifier` - The key to count attempts under, e.g. an email address or client IP
    ///
    /// # Returns
    ///
    /// Whether the attempt may proceed and, if not, how long to wait.
    pub async fn check_rate_limit(
        &self,
        identifier: &str,
    ) -> Result<RateLimitDecision, GatehouseError> {
        Ok(self.rate_limit_service.check_rate_limit(identifier).await?)
    }

    /// Clear the attempt history of `identifier` after a successful login.
    pub async fn reset_rate_limit(&self, identifier: &str) -> Result<bool, GatehouseError> {
        Ok(self.rate_limit_service.reset(identifier).await?)
    }

    /// Whether the request carries a live session; refreshes the cookie if so.
    pub fn validate_session<C>(&self, ctx: &mut C) -> bool
    where
        C: SessionContext + ?Sized,
    {
        self.session_service.validate_session(ctx)
    }

    /// Like [`validate_session`](Self::validate_session) but reports why a session
    /// is not live.
    pub fn check_session<C>(&self, ctx: &mut C) -> SessionCheck
    where
        C: SessionContext + ?Sized,
    {
        self.session_service.check_and_refresh(ctx)
    }

    /// Start a fresh session for the requesting device.
    pub fn initialize_session<C>(&self, ctx: &mut C) -> Result<SessionMetadata, GatehouseError>
    where
        C: SessionContext + ?Sized,
    {
        Ok(self.session_service.initialize_session(ctx)?)
    }

    pub fn classify_route(&self, path: &str) -> RouteClass {
        self.routes.classify(path)
    }

    /// Start background maintenance (eviction of stale attempt records).
    ///
    /// The task stops when `shutdown` changes.
    pub fn start_maintenance(
        &self,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tracing::info!(
            interval_secs = self.config.rate_limit.cleanup_interval.as_secs(),
            "Starting login attempt cleanup task"
        );
        self.rate_limit_service.start_cleanup_task(shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::error::{SessionError, StorageError, ValidationError};

    #[test]
    fn test_error_conversion() {
        let err: GatehouseError =
            gatehouse_core::Error::from(StorageError::Unavailable("down".into())).into();
        assert!(matches!(err, GatehouseError::StorageError(_)));

        let err: GatehouseError =
            gatehouse_core::Error::from(SessionError::CookieWrite("sent".into())).into();
        assert!(matches!(err, GatehouseError::SessionError(_)));

        let err: GatehouseError =
            gatehouse_core::Error::from(ValidationError::InvalidRoute("x".into())).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Invalid route table: x"
        );
    }

    #[test]
    fn test_new_uses_secure_defaults() {
        let gatehouse = Gatehouse::new(Arc::new(InMemoryAttemptRepository::new()));

        assert!(gatehouse.sessions().config().cookie.secure);
        assert_eq!(gatehouse.rate_limiter().config().max_attempts, 5);
        assert_eq!(gatehouse.classify_route("/login"), RouteClass::AuthOnly);
    }
}
