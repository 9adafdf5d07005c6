//! Event trait and the serialized wire format.
//!
//! Events are immutable facts. They are stored as `bincode` bytes tagged with
//! a versioned type name, so a stream can be replayed by any reader that knows
//! the event enum.
//!
//! # Example
//!
//! ```
//! use bloodtrack_core::event::Event;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum DonationEvent {
//!     Collected { donation_id: String },
//!     Voided { donation_id: String },
//! }
//!
//! impl Event for DonationEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             DonationEvent::Collected { .. } => "DonationCollected.v1",
//!             DonationEvent::Voided { .. } => "DonationVoided.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// Unknown event type encountered during deserialization.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// An event that can be stored in an event store and replayed to rebuild state.
///
/// `event_type()` returns a stable identifier with a version suffix
/// (`"UnitRegistered.v1"`) so the schema can evolve without breaking old
/// streams.
pub trait Event: Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupted or
    /// belong to an incompatible schema.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// A serialized event ready for storage.
///
/// This is the only shape the event store and event bus ever see.
#[derive(Clone, Debug, PartialEq)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "StatusChanged.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional JSON metadata (unit id, actor, correlation ids).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    ///
    /// # Examples
    ///
    /// ```
    /// use bloodtrack_core::event::SerializedEvent;
    ///
    /// let event = SerializedEvent::new("UnitRegistered.v1".to_string(), vec![1, 2, 3], None);
    /// assert_eq!(event.data.len(), 3);
    /// ```
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Create a serialized event from an `Event`.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Decode the payload back into its event type.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload does not
    /// decode as `E`.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        E::from_bytes(&self.data)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    enum SampleEvent {
        Drawn { bag: String, volume_ml: u32 },
        Labelled { bag: String, label: String },
    }

    impl Event for SampleEvent {
        fn event_type(&self) -> &'static str {
            match self {
                SampleEvent::Drawn { .. } => "SampleDrawn.v1",
                SampleEvent::Labelled { .. } => "SampleLabelled.v1",
            }
        }
    }

    #[test]
    fn event_type_is_versioned() {
        let event = SampleEvent::Drawn {
            bag: "bag-1".to_string(),
            volume_ml: 450,
        };
        assert_eq!(event.event_type(), "SampleDrawn.v1");
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn serialized_event_carries_type_and_metadata() {
        let event = SampleEvent::Labelled {
            bag: "bag-1".to_string(),
            label: "O NEG".to_string(),
        };
        let metadata = serde_json::json!({ "actor": "staff-7" });

        let serialized = SerializedEvent::from_event(&event, Some(metadata.clone()))
            .expect("serialization should succeed");

        assert_eq!(serialized.event_type, "SampleLabelled.v1");
        assert_eq!(serialized.metadata, Some(metadata));
        let decoded: SampleEvent = serialized.decode().expect("decode should succeed");
        assert_eq!(decoded, event);
    }

    #[test]
    fn decode_rejects_garbage() {
        let serialized = SerializedEvent::new("SampleDrawn.v1".to_string(), vec![0xff], None);
        let result: Result<SampleEvent, _> = serialized.decode();
        assert!(matches!(result, Err(EventError::DeserializationError(_))));
    }

    #[test]
    fn display_shows_type_and_size() {
        let serialized = SerializedEvent::new("SampleDrawn.v1".to_string(), vec![1, 2, 3, 4], None);
        let display = format!("{serialized}");
        assert!(display.contains("SampleDrawn.v1"));
        assert!(display.contains("4 bytes"));
    }
}
