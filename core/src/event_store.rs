//! Append-only event storage with optimistic concurrency.
//!
//! The ledger needs exactly two things from persistence: load a stream in
//! order, and append to it only if nobody else appended since it was loaded.
//! Any ordered log or row-versioned table can provide that.
//!
//! # Implementations
//!
//! - `InMemoryEventStore` (in `bloodtrack-testing`): tests and the demo binary
//!
//! # Example
//!
//! ```no_run
//! use bloodtrack_core::event::SerializedEvent;
//! use bloodtrack_core::event_store::{EventStore, EventStoreError};
//! use bloodtrack_core::stream::{StreamId, Version};
//!
//! async fn append_after_load<E: EventStore>(
//!     store: &E,
//!     event: SerializedEvent,
//! ) -> Result<Version, EventStoreError> {
//!     let stream_id = StreamId::new("unit-123");
//!     let loaded = store.load_events(stream_id.clone(), None).await?;
//!     let expected = Version::new(loaded.len() as u64);
//!
//!     // Fails with ConcurrencyConflict if someone appended in between.
//!     store.append_events(stream_id, Some(expected), vec![event]).await
//! }
//! ```

use crate::event::SerializedEvent;
use crate::stream::{StreamId, Version};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Error, Debug)]
pub enum EventStoreError {
    /// The stream is not at the version the caller loaded.
    #[error("Concurrency conflict on {stream_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        /// The stream ID where the conflict occurred.
        stream_id: StreamId,
        /// The version we expected the stream to be at.
        expected: Version,
        /// The actual current version of the stream.
        actual: Version,
    },

    /// Backend connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Boxed future returned by [`EventStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, EventStoreError>> + Send + 'a>>;

/// Event store abstraction.
///
/// Streams are append-only: nothing is ever edited or deleted. Methods return
/// boxed futures so the trait stays usable as `Arc<dyn EventStore>`.
pub trait EventStore: Send + Sync {
    /// Append events to a stream with optimistic concurrency control.
    ///
    /// - `Some(version)`: the stream must currently be at `version`
    /// - `None`: append unconditionally
    ///
    /// The append is atomic: either every event is stored or none is.
    /// Returns the stream version after the append.
    ///
    /// # Errors
    ///
    /// - `ConcurrencyConflict`: the stream moved since it was loaded
    /// - `DatabaseError`: the backend failed
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> StoreFuture<'_, Version>;

    /// Load events from a stream, oldest first.
    ///
    /// `from_version` is the 1-based position of the first event to return
    /// (`None` loads everything). A stream that does not exist loads as an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// - `DatabaseError`: the backend failed
    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> StoreFuture<'_, Vec<SerializedEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_conflict_error_display() {
        let error = EventStoreError::ConcurrencyConflict {
            stream_id: StreamId::new("unit-1"),
            expected: Version::new(2),
            actual: Version::new(3),
        };

        let display = format!("{error}");
        assert!(display.contains("unit-1"));
        assert!(display.contains("expected version 2"));
        assert!(display.contains("found 3"));
    }
}
