use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::Method,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use gatehouse::{AttemptRepository, Gatehouse, RouteClass, SessionCheck};

use crate::{context::AxumSessionContext, error::AuthError, types::ClientIdentifier};

pub struct GatehouseState<R: AttemptRepository> {
    pub gatehouse: Arc<Gatehouse<R>>,
}

impl<R: AttemptRepository> GatehouseState<R> {
    pub fn new(gatehouse: Arc<Gatehouse<R>>) -> Self {
        Self { gatehouse }
    }
}

impl<R: AttemptRepository> Clone for GatehouseState<R> {
    fn clone(&self) -> Self {
        Self {
            gatehouse: self.gatehouse.clone(),
        }
    }
}

/// Route guard: session liveness for every non-public request.
///
/// - Protected paths without a live session are redirected to the login page,
///   carrying the original path in the redirect parameter.
/// - Auth-only paths (login, signup) with a live session are redirected home.
/// - A live session's metadata is refreshed on the response and made available
///   to handlers through [`LiveSession`](crate::LiveSession).
pub async fn session_guard<R>(
    State(state): State<GatehouseState<R>>,
    mut request: Request,
    next: Next,
) -> Response
where
    R: AttemptRepository,
{
    let path = request.uri().path().to_string();
    let class = state.gatehouse.classify_route(&path);
    if class == RouteClass::Public {
        return next.run(request).await;
    }

    let mut ctx = AxumSessionContext::from_headers(request.headers());
    let live = match state.gatehouse.check_session(&mut ctx) {
        SessionCheck::Live(metadata) => Some(metadata),
        other => {
            tracing::debug!(path = %path, reason = other.reason(), "No live session");
            None
        }
    };

    let routes = state.gatehouse.routes();
    match (class, live) {
        (RouteClass::Protected, None) => {
            Redirect::to(&routes.login_redirect(&path)).into_response()
        }
        (RouteClass::AuthOnly, Some(_)) => {
            (ctx.into_jar(), Redirect::to(&routes.home_path)).into_response()
        }
        (_, Some(metadata)) => {
            request.extensions_mut().insert(metadata);
            let response = next.run(request).await;
            (ctx.into_jar(), response).into_response()
        }
        (_, None) => next.run(request).await,
    }
}

/// Login attempt governor keyed by client address.
///
/// Apply to the login route with `route_layer`. Only submissions are counted;
/// `GET`, `HEAD` and `OPTIONS` pass through. A store failure lets the request
/// through and is logged. Forwarding headers are only consulted when the
/// config sets `trust_proxy_headers`. The resolved [`ClientIdentifier`] is
/// stored on the request for handlers.
pub async fn login_rate_limit<R>(
    State(state): State<GatehouseState<R>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AttemptRepository,
{
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(next.run(request).await);
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let trust_proxy_headers = state.gatehouse.config().trust_proxy_headers;
    let client = ClientIdentifier::resolve(request.headers(), peer, trust_proxy_headers);
    request.extensions_mut().insert(client.clone());

    match state.gatehouse.check_rate_limit(client.as_str()).await {
        Ok(decision) if !decision.allowed => {
            return Err(AuthError::RateLimited {
                retry_after: decision.retry_after_seconds().unwrap_or_default(),
            });
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                identifier = %client.as_str(),
                error = %e,
                "Login rate limit check failed, allowing request"
            );
        }
    }

    Ok(next.run(request).await)
}
