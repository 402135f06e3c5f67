//! Device fingerprinting
//!
//! A fingerprint is the SHA-256 digest of four request header values joined with
//! `|`. It ties a session cookie to the browser that received it. Headers are
//! trivially spoofable, so a matching fingerprint is a liveness signal, not proof
//! of identity.

use crate::crypto::sha256_hex;

/// Headers that contribute to the fingerprint, in digest order.
pub const FINGERPRINT_HEADERS: [&str; 4] = [
    "user-agent",
    "accept-language",
    "sec-ch-ua",
    "sec-ch-ua-platform",
];

const DELIMITER: &str = "|";

/// The request header values a fingerprint is computed from.
///
/// A missing header is represented by an empty string, so a request without any
/// of them still has a (shared) fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceHeaders {
    pub user_agent: String,
    pub accept_language: String,
    pub sec_ch_ua: String,
    pub sec_ch_ua_platform: String,
}

impl DeviceHeaders {
    /// Collect the fingerprint headers through a header lookup function.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let [user_agent, accept_language, sec_ch_ua, sec_ch_ua_platform] =
            FINGERPRINT_HEADERS.map(|name| lookup(name).unwrap_or_default());

        Self {
            user_agent,
            accept_language,
            sec_ch_ua,
            sec_ch_ua_platform,
        }
    }

    /// Compute the fingerprint for these headers.
    pub fn fingerprint(&self) -> String {
        device_fingerprint(self)
    }
}

/// Hex-encoded SHA-256 over the pipe-joined header values.
pub fn device_fingerprint(headers: &DeviceHeaders) -> String {
    let joined = [
        headers.user_agent.as_str(),
        headers.accept_language.as_str(),
        headers.sec_ch_ua.as_str(),
        headers.sec_ch_ua_platform.as_str(),
    ]
    .join(DELIMITER);

    sha256_hex(&joined)
}
