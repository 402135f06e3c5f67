//! Builder pattern for constructing Gatehouse instances
//!
//! This module provides a type-safe builder for creating [`Gatehouse`] instances with
//! compile-time enforcement that an attempt store has been chosen.
//!
//! # Example
//!
//! ```rust
//! use gatehouse::{Gatehouse, GatehouseConfig, RouteTable};
//!
//! let gatehouse = Gatehouse::builder()
//!     .with_in_memory_store()
//!     .with_config(GatehouseConfig::from_env())
//!     .with_route_table(RouteTable::default().protect("/billing"))
//!     .build()
//!     .expect("default configuration is valid");
//! ```

use std::sync::Arc;

use chrono::Duration;
use gatehouse_core::{
    AttemptRepository, Clock, InMemoryAttemptRepository, RateLimitConfig, RouteTable,
    SessionConfig, SystemClock,
};

use crate::{Gatehouse, GatehouseConfig};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a Gatehouse instance.
#[derive(Debug, thiserror::Error)]
pub enum GatehouseBuilderError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no attempt store has been configured yet.
///
/// This is the initial state of [`GatehouseBuilder`].
pub struct NoStore;

/// Marker type indicating an attempt store has been configured.
pub struct WithStore<R: AttemptRepository> {
    repository: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`Gatehouse`] instances.
///
/// # Type States
///
/// - [`NoStore`]: Initial state, a store must be configured
/// - [`WithStore<R>`]: Store configured, ready to build
pub struct GatehouseBuilder<Store> {
    store: Store,
    config: GatehouseConfig,
    routes: RouteTable,
    clock: Arc<dyn Clock>,
}

impl Default for GatehouseBuilder<NoStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl GatehouseBuilder<NoStore> {
    /// Create a new builder with default configuration (`Secure` cookies).
    pub fn new() -> Self {
        Self {
            store: NoStore,
            config: GatehouseConfig::default(),
            routes: RouteTable::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Keep attempt records in process memory.
    pub fn with_in_memory_store(self) -> GatehouseBuilder<WithStore<InMemoryAttemptRepository>> {
        self.with_repository(Arc::new(InMemoryAttemptRepository::new()))
    }

    /// Keep attempt records in a custom repository.
    pub fn with_repository<R: AttemptRepository>(
        self,
        repository: Arc<R>,
    ) -> GatehouseBuilder<WithStore<R>> {
        GatehouseBuilder {
            store: WithStore { repository },
            config: self.config,
            routes: self.routes,
            clock: self.clock,
        }
    }
}

impl<Store> GatehouseBuilder<Store> {
    /// Replace the whole configuration.
    pub fn with_config(mut self, config: GatehouseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rate_limit_config(mut self, config: RateLimitConfig) -> Self {
        self.config.rate_limit = config;
        self
    }

    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Set the session activity timeout
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.config.session.timeout = timeout;
        self
    }

    /// Turn login attempt tracking off entirely.
    pub fn disable_rate_limiting(mut self) -> Self {
        self.config.rate_limit.enabled = false;
        self
    }

    pub fn with_route_table(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }

    /// Read time from `clock` instead of the system clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl<R: AttemptRepository> GatehouseBuilder<WithStore<R>> {
    /// Validate the configuration and build the Gatehouse instance.
    pub fn build(self) -> Result<Gatehouse<R>, GatehouseBuilderError> {
        self.config
            .rate_limit
            .validate()
            .and_then(|_| self.config.session.validate())
            .and_then(|_| self.routes.validate())
            .map_err(|e| GatehouseBuilderError::InvalidConfiguration(e.to_string()))?;

        tracing::debug!(
            environment = ?self.config.environment,
            rate_limit_enabled = self.config.rate_limit.enabled,
            session_timeout_secs = self.config.session.timeout.num_seconds(),
            "Built gatehouse"
        );

        Ok(Gatehouse::from_parts(
            self.store.repository,
            self.config,
            self.routes,
            self.clock,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let gatehouse = GatehouseBuilder::new().with_in_memory_store().build().unwrap();

        assert!(gatehouse.rate_limiter().is_enabled());
        assert_eq!(gatehouse.sessions().config().timeout, Duration::minutes(30));
        assert!(gatehouse.sessions().config().cookie.secure);
        assert!(gatehouse.config().environment.is_production());
    }

    #[test]
    fn test_builder_matches_direct_constructor() {
        let built = GatehouseBuilder::new().with_in_memory_store().build().unwrap();
        let direct = Gatehouse::new(Arc::new(InMemoryAttemptRepository::new()));

        assert_eq!(
            built.sessions().config().cookie.secure,
            direct.sessions().config().cookie.secure
        );
        assert_eq!(built.config().environment, direct.config().environment);
    }

    #[test]
    fn test_builder_rejects_short_block() {
        let result = GatehouseBuilder::new()
            .with_in_memory_store()
            .with_rate_limit_config(RateLimitConfig {
                block_duration: Duration::minutes(1),
                ..RateLimitConfig::default()
            })
            .build();

        assert!(matches!(
            result,
            Err(GatehouseBuilderError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_builder_rejects_invalid_session_timeout() {
        let result = GatehouseBuilder::new()
            .with_in_memory_store()
            .with_session_timeout(Duration::seconds(-1))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_protected_login_page() {
        let result = GatehouseBuilder::new()
            .with_route_table(RouteTable::default().protect("/login"))
            .with_in_memory_store()
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_disable_rate_limiting() {
        let gatehouse = GatehouseBuilder::new()
            .disable_rate_limiting()
            .with_in_memory_store()
            .build()
            .unwrap();

        assert!(!gatehouse.rate_limiter().is_enabled());
    }
}
