//! Clock abstraction.
//!
//! Access decisions are always evaluated against an explicit instant. The
//! [`Clock`] trait is how hosts supply that instant when they do not pass one
//! themselves.

use std::sync::{Arc, Mutex};

pub use chrono::{DateTime, Duration, TimeZone, Utc};

/// A UTC instant.
pub type Timestamp = DateTime<Utc>;

/// Returns the current wall clock time.
pub fn now() -> Timestamp {
    Utc::now()
}

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// [`Clock`] that reports a fixed instant until it is moved.
///
/// Clones share the same instant, so a test can hand one clone to the code
/// under test and advance the other.
#[derive(Debug, Clone)]
pub struct FixedClock(Arc<Mutex<Timestamp>>);

impl FixedClock {
    /// Create a clock pinned at `instant`.
    pub fn new(instant: Timestamp) -> Self {
        Self(Arc::new(Mutex::new(instant)))
    }

    /// Pin the clock at a new instant.
    pub fn set(&self, instant: Timestamp) {
        match self.0.lock() {
            Ok(mut current) => *current = instant,
            Err(poisoned) => *poisoned.into_inner() = instant,
        }
    }

    /// Move the clock forward by `step`.
    pub fn advance(&self, step: Duration) {
        match self.0.lock() {
            Ok(mut current) => *current += step,
            Err(poisoned) => *poisoned.into_inner() += step,
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        match self.0.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_returns_reasonable_timestamp() {
        // Should be after year 2020
        assert!(SystemClock.now().timestamp() > 1_577_836_800);
    }

    #[test]
    fn it_returns_increasing_values() {
        let t1 = SystemClock.now();
        let t2 = SystemClock.now();
        assert!(t2 >= t1);
    }

    #[test]
    fn it_shares_instant_between_clones() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        let observer = clock.clone();

        clock.advance(Duration::days(2));
        assert_eq!(observer.now(), start + Duration::days(2));

        clock.set(start);
        assert_eq!(observer.now(), start);
    }
}
