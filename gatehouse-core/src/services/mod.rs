//! Service layer for policy logic
//!
//! This module contains the two policy services that request middleware consults.

pub mod rate_limit;
pub mod session;

pub use rate_limit::LoginRateLimitService;
pub use session::SessionLivenessService;
