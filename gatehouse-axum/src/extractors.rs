use std::{convert::Infallible, net::SocketAddr};

use axum::{
    Extension, RequestPartsExt,
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use gatehouse_core::{DeviceHeaders, SessionMetadata};

use crate::{
    error::AuthError,
    types::{ClientIdentifier, LiveSession, OptionalLiveSession, RequestDeviceHeaders},
};

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl ClientIdentifier {
    /// Resolve the client of a request from its peer address and, when trusted,
    /// its forwarding headers.
    pub fn resolve(
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        trust_proxy_headers: bool,
    ) -> Self {
        if trust_proxy_headers {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);

            if let Some(ip) = forwarded.or_else(|| header_value(headers, "x-real-ip")) {
                return ClientIdentifier(ip);
            }
        }

        match peer {
            Some(addr) => ClientIdentifier(addr.ip().to_string()),
            None => ClientIdentifier(Self::UNKNOWN.to_string()),
        }
    }
}

/// Uses the identifier resolved by [`login_rate_limit`](crate::login_rate_limit)
/// when present, otherwise the socket address.
impl<S> FromRequestParts<S> for ClientIdentifier
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(client) = parts.extensions.get::<ClientIdentifier>() {
            return Ok(client.clone());
        }

        let peer = parts
            .extract::<ConnectInfo<SocketAddr>>()
            .await
            .ok()
            .map(|ConnectInfo(addr)| addr);

        Ok(ClientIdentifier::resolve(&parts.headers, peer, false))
    }
}

impl<S> FromRequestParts<S> for RequestDeviceHeaders
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        Ok(RequestDeviceHeaders(DeviceHeaders::from_lookup(|name| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })))
    }
}

impl<S> FromRequestParts<S> for LiveSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Extension(metadata): Extension<SessionMetadata> =
            parts.extract().await.map_err(|_| AuthError::Unauthorized)?;

        Ok(LiveSession(metadata))
    }
}

impl<S> FromRequestParts<S> for OptionalLiveSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let metadata = parts.extensions.get::<SessionMetadata>().cloned();

        Ok(OptionalLiveSession(metadata))
    }
}
