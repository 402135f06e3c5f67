//! Environment configuration
//!
//! Every setting has a default matching the documented policy, so an empty
//! environment yields a production-shaped configuration except for the `Secure`
//! cookie attribute, which is only set when `GATEHOUSE_ENV=production`.
//! Values that do not parse, or that are out of range, fall back to the default.
//!
//! | Variable                            | Default      |
//! | ----------------------------------- | ------------ |
//! | `GATEHOUSE_ENV`                     | `development`|
//! | `GATEHOUSE_TRUST_PROXY_HEADERS`     | `false`      |
//! | `GATEHOUSE_RATE_LIMIT_ENABLED`      | `true`       |
//! | `GATEHOUSE_RATE_LIMIT_WINDOW_SECS`  | `900`        |
//! | `GATEHOUSE_RATE_LIMIT_MAX_ATTEMPTS` | `5`          |
//! | `GATEHOUSE_RATE_LIMIT_BLOCK_SECS`   | `1800`       |
//! | `GATEHOUSE_RATE_LIMIT_CLEANUP_SECS` | `600` (at most one day) |
//! | `GATEHOUSE_SESSION_TIMEOUT_SECS`    | `1800`       |

use std::{fmt::Display, str::FromStr};

use chrono::Duration;
use gatehouse_core::{RateLimitConfig, SessionConfig, storage::MAX_CLEANUP_INTERVAL};

/// Deployment environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" | "test" => Ok(Environment::Development),
            other => Err(format!("unknown environment {other:?}")),
        }
    }
}

/// Configuration for both policies, usually loaded with [`GatehouseConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatehouseConfig {
    pub environment: Environment,
    /// Key login attempts on `X-Forwarded-For` / `X-Real-IP` instead of the
    /// socket address. Only enable behind a proxy that overwrites these headers.
    pub trust_proxy_headers: bool,
    pub rate_limit: RateLimitConfig,
    pub session: SessionConfig,
}

impl Default for GatehouseConfig {
    /// Default policy values with `Secure` cookies.
    fn default() -> Self {
        Self::for_environment(Environment::Production)
    }
}

impl GatehouseConfig {
    /// Default policy values with cookie security matching `environment`.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            trust_proxy_headers: false,
            rate_limit: RateLimitConfig::default(),
            session: SessionConfig::default().with_secure_cookie(environment.is_production()),
        }
    }

    /// Load configuration from `GATEHOUSE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = parse_or(&lookup, "GATEHOUSE_ENV", Environment::default());
        let mut config = Self::for_environment(environment);
        config.trust_proxy_headers =
            parse_or(&lookup, "GATEHOUSE_TRUST_PROXY_HEADERS", config.trust_proxy_headers);

        let rate_limit = &mut config.rate_limit;
        rate_limit.enabled =
            parse_or(&lookup, "GATEHOUSE_RATE_LIMIT_ENABLED", rate_limit.enabled);
        rate_limit.window =
            seconds_or(&lookup, "GATEHOUSE_RATE_LIMIT_WINDOW_SECS", rate_limit.window);
        rate_limit.max_attempts = parse_or(
            &lookup,
            "GATEHOUSE_RATE_LIMIT_MAX_ATTEMPTS",
            rate_limit.max_attempts,
        );
        rate_limit.block_duration = seconds_or(
            &lookup,
            "GATEHOUSE_RATE_LIMIT_BLOCK_SECS",
            rate_limit.block_duration,
        );
        rate_limit.cleanup_interval = cleanup_interval_or(
            &lookup,
            "GATEHOUSE_RATE_LIMIT_CLEANUP_SECS",
            rate_limit.cleanup_interval,
        );

        config.session.timeout =
            seconds_or(&lookup, "GATEHOUSE_SESSION_TIMEOUT_SECS", config.session.timeout);

        tracing::debug!(
            environment = ?config.environment,
            trust_proxy_headers = config.trust_proxy_headers,
            rate_limit_enabled = config.rate_limit.enabled,
            "Loaded gatehouse configuration"
        );

        config
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };

    raw.trim().parse().unwrap_or_else(|e| {
        tracing::warn!(key = key, value = %raw, error = %e, "Invalid value, using default");
        default
    })
}

fn seconds_or<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    let secs = parse_or(lookup, key, default.num_seconds());
    Duration::try_seconds(secs).unwrap_or_else(|| {
        tracing::warn!(key = key, value = secs, "Duration out of range, using default");
        default
    })
}

fn cleanup_interval_or<F>(
    lookup: &F,
    key: &str,
    default: std::time::Duration,
) -> std::time::Duration
where
    F: Fn(&str) -> Option<String>,
{
    let interval = std::time::Duration::from_secs(parse_or(lookup, key, default.as_secs()));
    if interval > MAX_CLEANUP_INTERVAL {
        tracing::warn!(
            key = key,
            value = interval.as_secs(),
            max = MAX_CLEANUP_INTERVAL.as_secs(),
            "Cleanup interval too long, using default"
        );
        return default;
    }
    interval
}
