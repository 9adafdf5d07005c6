//! Publication of appended events to downstream consumers.
//!
//! The event store is the source of truth. Publishing happens after an event
//! is durably appended and is best-effort from the ledger's point of view:
//! consumers (notifications, projections, dashboards) own delivery guarantees
//! and must tolerate duplicates.
//!
//! ```text
//!  ledger operation ──► 1. append to event store (source of truth)
//!                           │
//!                           ▼
//!                       2. publish to topic "inventory-events"
//!                           │
//!                 ┌─────────┴─────────┐
//!                 ▼                   ▼
//!          notifications        stock dashboards
//! ```

use crate::event::SerializedEvent;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Topic not found or invalid
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// Network or transport error
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Publishing side of an event bus.
///
/// Implementations must be `Send + Sync`; the ledger shares one instance
/// across all concurrent operations.
pub trait EventBus: Send + Sync {
    /// Publish one event to a topic.
    ///
    /// # Errors
    ///
    /// - `InvalidTopic`: the topic name is empty or unknown to the backend
    /// - `PublishFailed` / `TransportError`: the backend rejected the event
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_failed_display_names_topic() {
        let error = EventBusError::PublishFailed {
            topic: "inventory-events".to_string(),
            reason: "broker unavailable".to_string(),
        };
        let display = error.to_string();
        assert!(display.contains("inventory-events"));
        assert!(display.contains("broker unavailable"));
    }
}
