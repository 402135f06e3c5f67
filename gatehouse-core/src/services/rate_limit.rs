//! Login attempt rate limiting.
//!
//! This module implements the login attempt governor: every login attempt for an
//! identifier (an email address, a client IP, or whatever the caller keys on) is
//! counted, and an identifier that exceeds the threshold within the rolling window
//! is blocked for a fixed period.
//!
//! # Policy
//!
//! With the default [`RateLimitConfig`]:
//!
//! - attempts 1 through 5 are allowed
//! - the 6th attempt within 15 idle minutes blocks the identifier for 30 minutes
//! - attempts during a block are denied with the remaining wait and are not counted
//! - after the block the next attempt counts as the first one
//! - a successful login calls [`LoginRateLimitService::reset`]
//!
//! This is a best-effort anti-abuse guard, not an access control: with the
//! in-memory store every process keeps its own counts.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatehouse_core::{InMemoryAttemptRepository, LoginRateLimitService, RateLimitConfig};
//!
//! let service = LoginRateLimitService::new(
//!     Arc::new(InMemoryAttemptRepository::new()),
//!     RateLimitConfig::default(),
//! );
//!
//! let decision = service.check_rate_limit("user@example.com").await?;
//! if !decision.allowed {
//!     // respond with 429 and decision.retry_after_seconds()
//! }
//! ```

use std::sync::Arc;

use crate::{
    Error,
    clock::{Clock, SystemClock},
    repositories::AttemptRepository,
    storage::{AttemptRecord, RateLimitConfig, RateLimitDecision},
};

/// Service for governing login attempts.
///
/// # Thread Safety
///
/// The service is shared across request tasks behind an `Arc`. Atomicity of the
/// per-identifier check-and-increment is provided by the repository.
pub struct LoginRateLimitService<R: AttemptRepository> {
    repository: Arc<R>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl<R: AttemptRepository> LoginRateLimitService<R> {
    /// Create a new service reading time from the system clock.
    pub fn new(repository: Arc<R>, config: RateLimitConfig) -> Self {
        Self::with_clock(repository, config, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            config,
            clock,
        }
    }

    /// Get the current configuration.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Register a login attempt for `identifier` and decide whether it may proceed.
    ///
    /// Unknown identifiers start from zero attempts. If protection is disabled
    /// every attempt is allowed and nothing is recorded.
    ///
    /// # Errors
    ///
    /// Only repository failures are returned; the in-memory repository has none.
    pub async fn check_rate_limit(&self, identifier: &str) -> Result<RateLimitDecision, Error> {
        if !self.config.enabled {
            return Ok(RateLimitDecision::allowed(0));
        }

        let decision = self
            .repository
            .apply_attempt(identifier, self.clock.now(), &self.config)
            .await?;

        if decision.allowed {
            tracing::debug!(
                identifier = %identifier,
                attempts = decision.attempts,
                "Login attempt allowed"
            );
        } else {
            tracing::warn!(
                identifier = %identifier,
                attempts = decision.attempts,
                retry_after_secs = decision.retry_after_seconds().unwrap_or_default(),
                "Login attempt rate limited"
            );
        }

        Ok(decision)
    }

    /// Forget all attempts for `identifier`.
    ///
    /// Call this after a successful login.
    ///
    /// # Returns
    ///
    /// `true` if the identifier had a record.
    pub async fn reset(&self, identifier: &str) -> Result<bool, Error> {
        let existed = self.repository.remove(identifier).await?;
        if existed {
            tracing::debug!(identifier = %identifier, "Cleared login attempt history");
        }
        Ok(existed)
    }

    /// Current record for `identifier`, without registering an attempt.
    pub async fn attempt_record(&self, identifier: &str) -> Result<Option<AttemptRecord>, Error> {
        self.repository.get(identifier).await
    }

    /// Number of identifiers currently tracked.
    pub async fn tracked_identifiers(&self) -> Result<usize, Error> {
        self.repository.len().await
    }

    /// Remove records that no longer influence any decision.
    ///
    /// A record idle for at least the longer of window and block duration
    /// behaves exactly like a missing one, so this never changes an outcome.
    pub async fn evict_stale(&self) -> Result<u64, Error> {
        self.repository
            .evict_stale(self.clock.now(), &self.config)
            .await
    }

    /// Start the background eviction task.
    ///
    /// Runs [`evict_stale`](Self::evict_stale) every `cleanup_interval` until the
    /// `shutdown` channel changes.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let repository = Arc::clone(&self.repository);
        let clock = Arc::clone(&self.clock);
        let config = self.config.clone();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(config.cleanup_interval);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match repository.evict_stale(clock.now(), &config).await {
                            Ok(count) if count > 0 => {
                                tracing::info!(
                                    count = count,
                                    "Evicted stale login attempt records"
                                );
                            }
                            Err(e) => {
                                tracing::warn!(
                                    error = %e,
                                    "Failed to evict stale login attempt records"
                                );
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login attempt cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
