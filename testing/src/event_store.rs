//! In-memory event store.
//!
//! Streams live in a `HashMap` behind a lock. The version check and the
//! append happen under the same write guard, so the conflict semantics match
//! a conditional insert in a real database.

use bloodtrack_core::event::SerializedEvent;
use bloodtrack_core::event_store::{EventStore, EventStoreError, StoreFuture};
use bloodtrack_core::stream::{StreamId, Version};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// `HashMap`-backed [`EventStore`].
///
/// Cloning shares the underlying streams.
///
/// # Example
///
/// ```
/// use bloodtrack_core::event::SerializedEvent;
/// use bloodtrack_core::event_store::EventStore;
/// use bloodtrack_core::stream::{StreamId, Version};
/// use bloodtrack_testing::InMemoryEventStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryEventStore::new();
/// let stream = StreamId::new("unit-1");
/// let event = SerializedEvent::new("UnitRegistered.v1".to_string(), vec![1], None);
///
/// let version = store.append_events(stream.clone(), Some(Version::INITIAL), vec![event]).await?;
/// assert_eq!(version, Version::new(1));
/// assert_eq!(store.load_events(stream, None).await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventStore {
    streams: Arc<RwLock<HashMap<StreamId, Vec<SerializedEvent>>>>,
}

impl InMemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams that have at least one event.
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of events stored in one stream.
    #[must_use]
    pub fn event_count(&self, stream_id: &StreamId) -> usize {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(stream_id)
            .map_or(0, Vec::len)
    }

    fn append_sync(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> Result<Version, EventStoreError> {
        let mut streams = self
            .streams
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let current = Version::new(streams.get(&stream_id).map_or(0, Vec::len) as u64);

        if let Some(expected) = expected_version {
            if expected != current {
                tracing::debug!(
                    stream_id = %stream_id,
                    expected = %expected,
                    actual = %current,
                    "Rejecting append on stale version"
                );
                return Err(EventStoreError::ConcurrencyConflict {
                    stream_id,
                    expected,
                    actual: current,
                });
            }
        }

        if events.is_empty() {
            return Ok(current);
        }

        let appended = events.len() as u64;
        streams.entry(stream_id).or_default().extend(events);
        Ok(current + appended)
    }

    fn load_sync(&self, stream_id: &StreamId, from_version: Option<Version>) -> Vec<SerializedEvent> {
        let streams = self.streams.read().unwrap_or_else(PoisonError::into_inner);
        let Some(events) = streams.get(stream_id) else {
            return Vec::new();
        };

        let skip = from_version
            .map_or(0, |v| v.value().saturating_sub(1))
            .try_into()
            .unwrap_or(usize::MAX);

        events.iter().skip(skip).cloned().collect()
    }
}

impl EventStore for InMemoryEventStore {
    fn append_events(
        &self,
        stream_id: StreamId,
        expected_version: Option<Version>,
        events: Vec<SerializedEvent>,
    ) -> StoreFuture<'_, Version> {
        Box::pin(async move { self.append_sync(stream_id, expected_version, events) })
    }

    fn load_events(
        &self,
        stream_id: StreamId,
        from_version: Option<Version>,
    ) -> StoreFuture<'_, Vec<SerializedEvent>> {
        Box::pin(async move { Ok(self.load_sync(&stream_id, from_version)) })
    }
}
