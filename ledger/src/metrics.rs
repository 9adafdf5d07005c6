//! Prometheus-style counters for the ledger.
//!
//! Counters go through the `metrics` facade. Without an installed recorder
//! they are no-ops, so library users and tests pay nothing. The demo binary
//! installs a Prometheus recorder via [`install_prometheus`].

use crate::error::LedgerError;
use crate::events::InventoryEvent;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Status transitions appended, labelled by `to` and `reason`.
pub const TRANSITIONS_TOTAL: &str = "ledger_transitions_total";
/// Lab results recorded, labelled by `kind` (`typing`/`screening`).
pub const LAB_RESULTS_TOTAL: &str = "ledger_lab_results_total";
/// Appends rejected because another writer got there first.
pub const CONCURRENCY_CONFLICTS_TOTAL: &str = "ledger_concurrency_conflicts_total";
/// Commands rejected by validation, labelled by `kind`.
pub const REJECTED_COMMANDS_TOTAL: &str = "ledger_rejected_commands_total";
/// Transitions that could not be published.
pub const PUBLISH_ERRORS_TOTAL: &str = "ledger_publish_errors_total";
/// Time spent appending to the event store.
pub const APPEND_DURATION_SECONDS: &str = "ledger_append_duration_seconds";

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build the exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install the exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Register descriptions for every ledger metric.
pub fn describe_metrics() {
    describe_counter!(TRANSITIONS_TOTAL, "Status transitions appended to unit streams");
    describe_counter!(LAB_RESULTS_TOTAL, "Typing and screening results recorded");
    describe_counter!(
        CONCURRENCY_CONFLICTS_TOTAL,
        "Appends rejected by the optimistic concurrency check"
    );
    describe_counter!(REJECTED_COMMANDS_TOTAL, "Ledger commands rejected by validation");
    describe_counter!(PUBLISH_ERRORS_TOTAL, "Transitions that failed to publish");
    describe_histogram!(APPEND_DURATION_SECONDS, "Time taken to append a unit event");
}

/// Install a global Prometheus recorder and describe the ledger metrics.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_prometheus() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    describe_metrics();
    Ok(handle)
}

/// Ledger metrics recorder.
pub struct LedgerMetrics;

impl LedgerMetrics {
    /// Record an appended status transition.
    pub fn record_transition(event: &InventoryEvent) {
        counter!(
            TRANSITIONS_TOTAL,
            "to" => event.to_status.as_str(),
            "reason" => event.reason.as_str()
        )
        .increment(1);
    }

    /// Record a lab result.
    pub fn record_lab_result(kind: &'static str) {
        counter!(LAB_RESULTS_TOTAL, "kind" => kind).increment(1);
    }

    /// Record a failed command. Conflicts are counted separately.
    pub fn record_failure(error: &LedgerError) {
        if error.is_retryable() {
            counter!(CONCURRENCY_CONFLICTS_TOTAL).increment(1);
        } else {
            counter!(REJECTED_COMMANDS_TOTAL, "kind" => error.kind()).increment(1);
        }
    }

    /// Record a publish failure.
    pub fn record_publish_error() {
        counter!(PUBLISH_ERRORS_TOTAL).increment(1);
    }

    /// Record an append duration.
    pub fn record_append(duration: Duration) {
        histogram!(APPEND_DURATION_SECONDS).record(duration.as_secs_f64());
    }
}
