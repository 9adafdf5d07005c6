//! Ledger configuration.
//!
//! Loaded from environment variables with defaults for every field.

use crate::lab::ReleasePolicy;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default service name reported by `ping`/`whoami`.
pub const DEFAULT_SERVICE_NAME: &str = "BloodTrackBackend";

/// Default topic transitions are published to.
pub const DEFAULT_EVENT_TOPIC: &str = "inventory-events";

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Name reported by the liveness probe
    pub service_name: String,
    /// Topic status transitions are published to
    pub event_topic: String,
    /// Publish transitions when an event bus is attached
    pub publish_events: bool,
    /// Release criteria
    pub release_policy: ReleasePolicy,
    /// Retry behaviour for `ConcurrentModification`
    pub retry: RetryConfig,
}

/// Retry settings, in plain numbers so they serialize cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Cap on the delay between retries, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 10,
            max_delay_ms: 500,
        }
    }
}

impl RetryConfig {
    /// Build the retry policy these settings describe.
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.max_retries)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .build()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            event_topic: DEFAULT_EVENT_TOPIC.to_string(),
            publish_events: true,
            release_policy: ReleasePolicy::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `LEDGER_SERVICE_NAME` | `BloodTrackBackend` |
    /// | `LEDGER_EVENT_TOPIC` | `inventory-events` |
    /// | `LEDGER_PUBLISH_EVENTS` | `true` |
    /// | `LEDGER_REQUIRE_TYPING` | `false` |
    /// | `LEDGER_RETRY_MAX` | `3` |
    /// | `LEDGER_RETRY_INITIAL_DELAY_MS` | `10` |
    /// | `LEDGER_RETRY_MAX_DELAY_MS` | `500` |
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        fn parsed_with<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|s| s.trim().parse().ok())
        }

        Self {
            service_name: lookup("LEDGER_SERVICE_NAME")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.service_name),
            event_topic: lookup("LEDGER_EVENT_TOPIC")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.event_topic),
            publish_events: lookup("LEDGER_PUBLISH_EVENTS")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.publish_events),
            release_policy: ReleasePolicy {
                require_typing: lookup("LEDGER_REQUIRE_TYPING")
                    .and_then(|s| parse_bool(&s))
                    .unwrap_or(defaults.release_policy.require_typing),
            },
            retry: RetryConfig {
                max_retries: parsed_with(&lookup, "LEDGER_RETRY_MAX").unwrap_or(defaults.retry.max_retries),
                initial_delay_ms: parsed_with(&lookup, "LEDGER_RETRY_INITIAL_DELAY_MS")
                    .unwrap_or(defaults.retry.initial_delay_ms),
                max_delay_ms: parsed_with(&lookup, "LEDGER_RETRY_MAX_DELAY_MS")
                    .unwrap_or(defaults.retry.max_delay_ms),
            },
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
