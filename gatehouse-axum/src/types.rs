use gatehouse_core::{DeviceHeaders, SessionMetadata};
use serde::{Deserialize, Serialize};

/// The key login attempts are counted under when no better identifier is known.
///
/// The socket address by default. With `trust_proxy_headers` enabled, the first
/// `X-Forwarded-For` entry or `X-Real-IP` take precedence. Without either source
/// every request shares [`ClientIdentifier::UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentifier(pub String);

impl ClientIdentifier {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Session metadata of a request the guard found live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSession(pub SessionMetadata);

/// Session metadata if the guard found one, `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalLiveSession(pub Option<SessionMetadata>);

/// Fingerprint headers of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDeviceHeaders(pub DeviceHeaders);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub last_activity: i64,
    pub expires_in_secs: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
