//! Core functionality for the gatehouse project
//!
//! This crate contains the two policy components that request middleware consults
//! before a login or a protected page is served:
//!
//! - [`LoginRateLimitService`] tracks login attempts per identifier and locks the
//!   identifier out for a while once it exceeds the threshold.
//! - [`SessionLivenessService`] validates the client-held session metadata cookie
//!   against an activity timeout and a device fingerprint.
//!
//! It also contains the [`RouteTable`] used to decide which requests need a live
//! session at all.
//!
//! The core crate has no web framework dependency. Framework integrations implement
//! [`SessionContext`] for their request type; see `gatehouse-axum`.
pub mod clock;
pub mod crypto;
pub mod error;
pub mod fingerprint;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod session;
pub mod storage;

pub use clock::{Clock, SystemClock};
pub use error::Error;
pub use fingerprint::{DeviceHeaders, device_fingerprint};
pub use repositories::{AttemptRepository, InMemoryAttemptRepository};
pub use routes::{RouteClass, RouteTable};
pub use services::{LoginRateLimitService, SessionLivenessService};
pub use session::{
    CookieSameSite, CookieSettings, SessionCheck, SessionConfig, SessionContext, SessionCookie,
    SessionMetadata,
};
pub use storage::{AttemptRecord, RateLimitConfig, RateLimitDecision};

#[cfg(any(test, feature = "test-helpers"))]
pub use clock::MockClock;
