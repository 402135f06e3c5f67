//! Wall-clock abstraction.
//!
//! Both policies compare stored timestamps against "now". Taking the time from a
//! [`Clock`] instead of calling `Utc::now()` directly lets tests move time forward
//! across a 30 minute lockout without sleeping.

use std::fmt::Debug;

use chrono::{DateTime, Utc};

/// Source of the current time.
pub trait Clock: Debug + Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// System clock backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(any(test, feature = "test-helpers"))]
pub use mock::MockClock;

#[cfg(any(test, feature = "test-helpers"))]
mod mock {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, Duration, Utc};

    use super::Clock;

    /// Controllable clock for tests.
    ///
    /// Clones share the same underlying time, so a clock handed to a service can
    /// still be advanced from the test body.
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use gatehouse_core::{Clock, MockClock};
    ///
    /// let start = Utc::now();
    /// let clock = MockClock::new(start);
    /// clock.advance(Duration::minutes(30));
    /// assert_eq!(clock.now(), start + Duration::minutes(30));
    /// ```
    #[derive(Debug, Clone)]
    pub struct MockClock {
        current_time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                current_time: Arc::new(Mutex::new(start)),
            }
        }

        /// Advance the clock by a duration.
        pub fn advance(&self, duration: Duration) {
            let mut time = self
                .current_time
                .lock()
                .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
            *time += duration;
        }

        /// Set the clock to a specific instant.
        pub fn set(&self, instant: DateTime<Utc>) {
            let mut time = self
                .current_time
                .lock()
                .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
            *time = instant;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .current_time
                .lock()
                .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
        }
    }
}
