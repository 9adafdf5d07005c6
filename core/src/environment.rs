//! Injected dependencies.
//!
//! Anything the ledger reads from the outside world at call time goes through
//! a trait here so tests can pin it down.

use chrono::{DateTime, Utc};

/// Source of the current time.
///
/// Expiry decisions and event timestamps both read the clock at call time;
/// there is no background timer.
///
/// # Examples
///
/// ```
/// use bloodtrack_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let before = clock.now();
/// assert!(clock.now() >= before);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
