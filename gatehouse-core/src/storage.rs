//! Data types for login attempt tracking.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Per-identifier login attempt state.
///
/// A record with `blocked == true` admits no attempts until `block_duration`
/// has passed since `last_attempt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempts: u32,
    pub last_attempt: DateTime<Utc>,
    pub blocked: bool,
}

impl AttemptRecord {
    /// A record with no attempts, as created on first sight of an identifier.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            last_attempt: now,
            blocked: false,
        }
    }

    /// Register one login attempt at `now` and decide whether it may proceed.
    ///
    /// A denied attempt against an active block leaves the record untouched, so
    /// the remaining wait keeps shrinking as time passes. The attempt that crosses
    /// the threshold starts a fresh block of the full duration.
    pub fn register_attempt(
        &mut self,
        now: DateTime<Utc>,
        config: &RateLimitConfig,
    ) -> RateLimitDecision {
        let elapsed = now - self.last_attempt;

        if self.blocked {
            if elapsed < config.block_duration {
                return RateLimitDecision::denied(
                    config.block_duration - elapsed,
                    self.attempts,
                );
            }
            self.blocked = false;
            self.attempts = 0;
        }

        if elapsed > config.window {
            self.attempts = 0;
        }

        self.attempts = self.attempts.saturating_add(1);
        self.last_attempt = now;

        if self.attempts > config.max_attempts {
            self.blocked = true;
            return RateLimitDecision::denied(config.block_duration, self.attempts);
        }

        RateLimitDecision::allowed(self.attempts)
    }

    /// Whether the block on this record is still in force at `now`.
    pub fn is_blocked_at(&self, now: DateTime<Utc>, config: &RateLimitConfig) -> bool {
        self.blocked && now - self.last_attempt < config.block_duration
    }

    /// Whether this record would behave like a fresh one on its next check.
    pub fn is_stale(&self, now: DateTime<Utc>, config: &RateLimitConfig) -> bool {
        now - self.last_attempt >= config.retention()
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// How long the caller must wait; only set when the attempt is denied.
    pub wait_time: Option<Duration>,
    /// Attempt count in the current window after this check.
    pub attempts: u32,
}

impl RateLimitDecision {
    pub fn allowed(attempts: u32) -> Self {
        Self {
            allowed: true,
            wait_time: None,
            attempts,
        }
    }

    pub fn denied(wait_time: Duration, attempts: u32) -> Self {
        Self {
            allowed: false,
            wait_time: Some(wait_time),
            attempts,
        }
    }

    /// The wait time rounded up to whole seconds, suitable for `Retry-After`.
    pub fn retry_after_seconds(&self) -> Option<i64> {
        self.wait_time.map(|wait| {
            let millis = wait.num_milliseconds().max(0);
            (millis + 999) / 1000
        })
    }
}

/// Longest accepted interval between eviction sweeps.
pub const MAX_CLEANUP_INTERVAL: std::time::Duration =
    std::time::Duration::from_secs(24 * 60 * 60);

/// Configuration for the login attempt governor.
///
/// The defaults (15 minute window, 5 attempts, 30 minute block) are the
/// compatibility baseline; `block_duration` must not be shorter than `window`.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Whether attempts are tracked at all
    pub enabled: bool,
    /// Idle time after which the attempt count starts over
    pub window: Duration,
    /// Attempts allowed per window; the next one blocks
    pub max_attempts: u32,
    /// How long a blocked identifier has to wait
    pub block_duration: Duration,
    /// How often the background sweep evicts stale records
    pub cleanup_interval: std::time::Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window: Duration::minutes(15),
            max_attempts: 5,
            block_duration: Duration::minutes(30),
            cleanup_interval: std::time::Duration::from_secs(600),
        }
    }
}

impl RateLimitConfig {
    /// A configuration that admits every attempt without recording it.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Idle time after which a record carries no information.
    pub fn retention(&self) -> Duration {
        self.window.max(self.block_duration)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidRateLimit(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.window <= Duration::zero() {
            return Err(ValidationError::InvalidRateLimit(
                "window must be positive".to_string(),
            ));
        }
        if self.block_duration < self.window {
            return Err(ValidationError::InvalidRateLimit(format!(
                "block_duration ({}s) must not be shorter than window ({}s)",
                self.block_duration.num_seconds(),
                self.window.num_seconds()
            )));
        }
        if self.cleanup_interval.is_zero() {
            return Err(ValidationError::InvalidRateLimit(
                "cleanup_interval must be positive".to_string(),
            ));
        }
        if self.cleanup_interval > MAX_CLEANUP_INTERVAL {
            return Err(ValidationError::InvalidRateLimit(format!(
                "cleanup_interval must be at most {}s",
                MAX_CLEANUP_INTERVAL.as_secs()
            )));
        }
        Ok(())
    }
}
