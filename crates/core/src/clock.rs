//! Clock abstraction so TOTP windows, token expiries, and lockout timers are
//! deterministic under test.

use chrono::{DateTime, Utc};

/// A source of the current time.
///
/// Every module that compares against "now" (TOTP verification, token
/// expiry, lockout duration) takes a `&dyn Clock` rather than calling
/// `Utc::now()` directly, so tests can freeze or advance time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// A `Clock` backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A `Clock` whose value is set explicitly and advanced manually.
///
/// Kept as a regular (non-`cfg(test)`) module so downstream crates can pull
/// it into their own test code as an ordinary dev-dependency.
pub mod test_support {
    use std::sync::Mutex;

    use chrono::{DateTime, Duration, Utc};

    use super::Clock;

    /// A fixed point in time that tests can advance explicitly, instead of
    /// depending on wall-clock time for TOTP windows, token expiry, or
    /// lockout timers.
    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        /// Creates a clock fixed at `start`.
        #[must_use]
        pub fn new(start: DateTime<Utc>) -> Self {
            Self(Mutex::new(start))
        }

        /// Advances the clock by `delta`.
        pub fn advance(&self, delta: Duration) {
            let mut guard = match self.0.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard += delta;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            match self.0.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::test_support::FixedClock;
    use super::*;

    #[test]
    fn fixed_clock_advances_by_delta() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        clock.advance(Duration::minutes(15));
        assert_eq!(clock.now(), start + Duration::minutes(15));
    }

    #[test]
    fn system_clock_reports_current_time() {
        let before = Utc::now();
        let reported = SystemClock.now();
        assert!(reported >= before);
    }
}
