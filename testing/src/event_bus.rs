//! In-memory event bus that records what was published.

use bloodtrack_core::event::SerializedEvent;
use bloodtrack_core::event_bus::{EventBus, EventBusError};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Event bus that keeps every published `(topic, event)` pair in memory.
///
/// `set_failing(true)` makes every publish fail, which is how tests check
/// that publication problems never leak into ledger results.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventBus {
    published: Arc<Mutex<Vec<(String, SerializedEvent)>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryEventBus {
    /// Create a bus with nothing published.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent publishes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything published so far, in publish order.
    #[must_use]
    pub fn published(&self) -> Vec<(String, SerializedEvent)> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events published to one topic, in publish order.
    #[must_use]
    pub fn published_to(&self, topic: &str) -> Vec<SerializedEvent> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        Box::pin(async move {
            if topic.is_empty() {
                return Err(EventBusError::InvalidTopic(topic));
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: "bus configured to fail".to_string(),
                });
            }
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((topic, event));
            Ok(())
        })
    }
}
