//! Retrying operations that lost an optimistic-concurrency race.
//!
//! Every ledger write is "load, decide, append at the loaded version". When
//! two writers race on one unit, the loser gets
//! [`LedgerError::ConcurrentModification`] and nothing is written. Running
//! the whole operation again re-reads the unit and re-decides, so a retry can
//! legitimately end in a different error (the winner may have moved the unit
//! somewhere the loser's command is no longer allowed).
//!
//! # Example
//!
//! ```rust,no_run
//! use bloodtrack_ledger::retry::{RetryPolicy, retry_on_conflict};
//! # use bloodtrack_ledger::{UnitLedger, UnitId, Actor};
//! # async fn example(ledger: &UnitLedger, unit_id: UnitId) -> Result<(), bloodtrack_ledger::LedgerError> {
//! let policy = RetryPolicy::builder().max_retries(5).build();
//! let outcome = retry_on_conflict(&policy, || ledger.evaluate_and_transition(unit_id, Actor::System)).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

use crate::error::LedgerError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Exponential backoff settings.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 10ms
/// - `max_delay`: 500ms
/// - `multiplier`: 2.0
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap on the delay between retries
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: None,
            initial_delay: None,
            max_delay: None,
            multiplier: None,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// `initial_delay * multiplier^attempt`, capped at `max_delay`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(seconds).map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: Option<usize>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set maximum delay.
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(3),
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(10)),
            max_delay: self.max_delay.unwrap_or(Duration::from_millis(500)),
            multiplier: self.multiplier.unwrap_or(2.0),
        }
    }
}

/// Run `operation`, re-running it while it fails with a retryable error.
///
/// Only [`LedgerError::ConcurrentModification`] is retried. Any other error,
/// or the last conflict once `max_retries` is exhausted, is returned as is.
///
/// # Errors
///
/// Returns the error of the final attempt.
pub async fn retry_on_conflict<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            },
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                if attempt >= policy.max_retries {
                    tracing::error!(attempt, error = %err, "Operation failed after max retries");
                    return Err(err);
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Concurrent modification, retrying"
                );

                sleep(delay).await;
                attempt += 1;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast(max_retries: usize) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(1))
            .build()
    }

    #[test]
    fn delay_doubles_then_caps() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(500))
            .build();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10_000), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn conflict_is_retried_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let unit_id = UnitId::new();

        let result = retry_on_conflict(&fast(3), || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LedgerError::ConcurrentModification(unit_id))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert!(matches!(result, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let unit_id = UnitId::new();

        let result: Result<(), _> = retry_on_conflict(&fast(3), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LedgerError::UnitNotFound(unit_id))
            }
        })
        .await;

        assert!(matches!(result, Err(LedgerError::UnitNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let unit_id = UnitId::new();

        let result: Result<(), _> = retry_on_conflict(&fast(2), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LedgerError::ConcurrentModification(unit_id))
            }
        })
        .await;

        assert!(matches!(result, Err(LedgerError::ConcurrentModification(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn none_policy_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let unit_id = UnitId::new();

        let _: Result<(), _> = retry_on_conflict(&RetryPolicy::none(), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LedgerError::ConcurrentModification(unit_id))
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
