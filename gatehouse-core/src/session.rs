//! Session metadata
//!
//! Session liveness is tracked entirely on the client. The server writes a small
//! JSON document into a cookie and checks it on every request:
//!
//! | Field                | JSON key            | Description                              |
//! | -------------------- | ------------------- | ---------------------------------------- |
//! | `last_activity`      | `lastActivity`      | Epoch milliseconds of the last request   |
//! | `device_fingerprint` | `deviceFingerprint` | Hex SHA-256 of the device headers        |
//!
//! No server-side session table exists, so a session ends only by timing out, by
//! arriving from a different device, or by the cookie being overwritten.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::{SessionError, ValidationError},
    fingerprint::DeviceHeaders,
};

/// Default name of the session metadata cookie
pub const SESSION_COOKIE_NAME: &str = "session_metadata";

/// The payload of the session metadata cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
    pub device_fingerprint: String,
}

impl SessionMetadata {
    pub fn new(last_activity: DateTime<Utc>, device_fingerprint: impl Into<String>) -> Self {
        Self {
            last_activity,
            device_fingerprint: device_fingerprint.into(),
        }
    }

    /// Parse the cookie value.
    pub fn from_cookie_value(value: &str) -> Result<Self, SessionError> {
        serde_json::from_str(value).map_err(|e| SessionError::Malformed(e.to_string()))
    }

    /// Serialize into the cookie value.
    pub fn to_cookie_value(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::Serialization(e.to_string()))
    }
}

/// Result of evaluating a session cookie against the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCheck {
    /// The session is live; carries the refreshed metadata to write back
    Live(SessionMetadata),
    /// No session cookie was sent
    Missing,
    /// The cookie could not be parsed
    Malformed,
    /// The activity timeout has elapsed
    Expired,
    /// The cookie was issued to a different device
    FingerprintMismatch,
}

impl SessionCheck {
    pub fn is_live(&self) -> bool {
        matches!(self, SessionCheck::Live(_))
    }

    /// Short label for logs
    pub fn reason(&self) -> &'static str {
        match self {
            SessionCheck::Live(_) => "live",
            SessionCheck::Missing => "missing",
            SessionCheck::Malformed => "malformed",
            SessionCheck::Expired => "expired",
            SessionCheck::FingerprintMismatch => "fingerprint_mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CookieSameSite {
    Strict,
    #[default]
    Lax,
    None,
}

/// Attributes of the session metadata cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: CookieSameSite,
    pub path: String,
    pub max_age: Duration,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            http_only: true,
            secure: true,
            same_site: CookieSameSite::Lax,
            path: "/".to_string(),
            max_age: Duration::days(30),
        }
    }
}

impl CookieSettings {
    /// Settings for plain-HTTP local development (no `Secure` attribute).
    pub fn development() -> Self {
        Self {
            secure: false,
            ..Self::default()
        }
    }

    /// Build the cookie carrying `value` with these attributes.
    pub fn cookie(&self, value: String) -> SessionCookie {
        SessionCookie {
            name: self.name.clone(),
            value,
            http_only: self.http_only,
            secure: self.secure,
            same_site: self.same_site,
            path: self.path.clone(),
            max_age: self.max_age,
        }
    }
}

/// A cookie to be written back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: CookieSameSite,
    pub path: String,
    pub max_age: Duration,
}

/// Configuration for session liveness checks.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity after which a session is no longer live
    pub timeout: Duration,
    pub cookie: CookieSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::minutes(30),
            cookie: CookieSettings::default(),
        }
    }
}

impl SessionConfig {
    pub fn development() -> Self {
        Self {
            cookie: CookieSettings::development(),
            ..Self::default()
        }
    }

    /// Set the activity timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set whether the cookie carries the `Secure` attribute
    pub fn with_secure_cookie(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.timeout <= Duration::zero() {
            return Err(ValidationError::InvalidSession(
                "timeout must be positive".to_string(),
            ));
        }
        if self.cookie.name.is_empty() {
            return Err(ValidationError::InvalidSession(
                "cookie name must not be empty".to_string(),
            ));
        }
        if self.cookie.max_age <= Duration::zero() {
            return Err(ValidationError::InvalidSession(
                "cookie max_age must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// The view of an incoming request that session validation needs.
///
/// Web framework integrations implement this over their request and response
/// types. Header names are passed in lowercase.
pub trait SessionContext {
    /// Value of the cookie called `name`, if the request carried one.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Value of the request header called `name`.
    fn header(&self, name: &str) -> Option<String>;

    /// Queue `cookie` to be sent with the response.
    fn set_cookie(&mut self, cookie: SessionCookie) -> Result<(), Error>;

    /// The fingerprint headers of this request.
    fn device_headers(&self) -> DeviceHeaders {
        DeviceHeaders::from_lookup(|name| self.header(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_format() {
        let metadata = SessionMetadata::new(
            DateTime::from_timestamp_millis(1_700_000_000_123).unwrap(),
            "abc123",
        );

        let value = metadata.to_cookie_value().unwrap();
        assert_eq!(
            value,
            r#"{"lastActivity":1700000000123,"deviceFingerprint":"abc123"}"#
        );
    }

    #[test]
    fn test_metadata_parses_client_payload() {
        let metadata = SessionMetadata::from_cookie_value(
            r#"{"deviceFingerprint":"ff00","lastActivity":1700000000000}"#,
        )
        .unwrap();

        assert_eq!(metadata.device_fingerprint, "ff00");
        assert_eq!(metadata.last_activity.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_malformed_metadata_is_an_error() {
        for value in ["", "not json", "{}", r#"{"lastActivity":"soon","deviceFingerprint":"x"}"#] {
            let err = SessionMetadata::from_cookie_value(value).unwrap_err();
            assert!(matches!(err, SessionError::Malformed(_)), "{value}");
        }
    }

    #[test]
    fn test_cookie_settings_defaults() {
        let settings = CookieSettings::default();
        assert_eq!(settings.name, "session_metadata");
        assert!(settings.http_only);
        assert!(settings.secure);
        assert_eq!(settings.same_site, CookieSameSite::Lax);
        assert_eq!(settings.path, "/");
        assert_eq!(settings.max_age, Duration::days(30));

        assert!(!CookieSettings::development().secure);
    }

    #[test]
    fn test_cookie_carries_settings() {
        let cookie = CookieSettings::development().cookie("payload".to_string());
        assert_eq!(cookie.name, "session_metadata");
        assert_eq!(cookie.value, "payload");
        assert!(!cookie.secure);
        assert_eq!(cookie.max_age, Duration::days(30));
    }

    #[test]
    fn test_session_config_validation() {
        assert!(SessionConfig::default().validate().is_ok());
        assert!(
            SessionConfig::default()
                .with_timeout(Duration::zero())
                .validate()
                .is_err()
        );

        let mut config = SessionConfig::default();
        config.cookie.name = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_check_reasons() {
        assert!(SessionCheck::Live(SessionMetadata::new(Utc::now(), "x")).is_live());
        assert!(!SessionCheck::Expired.is_live());
        assert_eq!(SessionCheck::FingerprintMismatch.reason(), "fingerprint_mismatch");
    }
}
