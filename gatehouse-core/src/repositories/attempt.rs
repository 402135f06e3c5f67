//! Repository trait for login attempt records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    storage::{AttemptRecord, RateLimitConfig, RateLimitDecision},
};

/// Storage for per-identifier [`AttemptRecord`]s.
///
/// # Atomicity
///
/// `apply_attempt` must run [`AttemptRecord::register_attempt`] as one step per
/// identifier: two concurrent calls for the same identifier must observe each
/// other's increment. Implementations over a remote store need a per-key lock or
/// compare-and-swap loop to provide this.
#[async_trait]
pub trait AttemptRepository: Send + Sync + 'static {
    /// Register one attempt for `identifier` at `now`.
    ///
    /// Creates a fresh record if none exists, applies the transition and
    /// persists the result.
    ///
    /// # Returns
    ///
    /// The decision produced by the transition.
    async fn apply_attempt(
        &self,
        identifier: &str,
        now: DateTime<Utc>,
        config: &RateLimitConfig,
    ) -> Result<RateLimitDecision, Error>;

    /// Fetch the record for `identifier` without modifying it.
    async fn get(&self, identifier: &str) -> Result<Option<AttemptRecord>, Error>;

    /// Delete the record for `identifier`.
    ///
    /// # Returns
    ///
    /// `true` if a record existed.
    async fn remove(&self, identifier: &str) -> Result<bool, Error>;

    /// Delete every record that [`AttemptRecord::is_stale`] at `now`.
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    async fn evict_stale(
        &self,
        now: DateTime<Utc>,
        config: &RateLimitConfig,
    ) -> Result<u64, Error>;

    /// Number of identifiers currently tracked.
    async fn len(&self) -> Result<usize, Error>;
}
