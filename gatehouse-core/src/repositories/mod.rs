//! Repository traits and implementations for login attempt state
//!
//! [`AttemptRepository`] is the seam between the rate limit service and wherever
//! attempt records live. The bundled [`InMemoryAttemptRepository`] keeps them in
//! process memory; a deployment with several instances would implement the trait
//! over a shared cache instead.

pub mod attempt;
pub mod memory;

pub use attempt::AttemptRepository;
pub use memory::InMemoryAttemptRepository;
