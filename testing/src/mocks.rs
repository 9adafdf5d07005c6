//! Deterministic clocks.

use bloodtrack_core::environment::Clock;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, PoisonError, RwLock};

/// Fixed clock for deterministic tests
///
/// Always returns the same time.
///
/// # Example
///
/// ```
/// use bloodtrack_testing::FixedClock;
/// use bloodtrack_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can keep a handle while the ledger
/// owns another.
///
/// # Example
///
/// ```
/// use bloodtrack_testing::ManualClock;
/// use bloodtrack_core::environment::Clock;
/// use chrono::{Duration, Utc};
///
/// let start = Utc::now();
/// let clock = ManualClock::new(start);
/// clock.advance(Duration::days(36));
/// assert_eq!(clock.now(), start + Duration::days(36));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock starting at `time`.
    #[must_use]
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time: Arc::new(RwLock::new(time)),
        }
    }

    /// Move the clock forward (or backward, with a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
        *time += by;
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.time.write().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.time.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed clock at 2025-10-19 08:00:00 UTC.
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(test_epoch())
}

/// The instant [`test_clock`] is pinned to.
#[must_use]
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_never_moves() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now(), test_epoch());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(test_epoch());
        let handle = clock.clone();

        handle.advance(Duration::hours(2));
        assert_eq!(clock.now(), test_epoch() + Duration::hours(2));

        handle.set(test_epoch());
        assert_eq!(clock.now(), test_epoch());
    }
}
