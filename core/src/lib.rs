//! # BloodTrack Core
//!
//! Storage and eventing abstractions the unit ledger is built on.
//!
//! The ledger is event sourced: every blood unit is one append-only event
//! stream, and everything the ledger knows about a unit (its attributes, its
//! lab results, its status) is rebuilt by replaying that stream.
//!
//! ## Modules
//!
//! - [`event`]: the [`Event`](event::Event) trait and the bincode wire format
//! - [`stream`]: [`StreamId`](stream::StreamId) and [`Version`](stream::Version)
//! - [`event_store`]: append-only storage with optimistic concurrency
//! - [`event_bus`]: publication of appended events to downstream consumers
//! - [`environment`]: injected dependencies such as the [`Clock`](environment::Clock)
//!
//! ## Example
//!
//! ```ignore
//! use bloodtrack_core::event_store::EventStore;
//! use bloodtrack_core::stream::{StreamId, Version};
//!
//! async fn append<S: EventStore>(store: &S, events: Vec<SerializedEvent>) {
//!     let stream = StreamId::new("unit-3f1c");
//!     let loaded = store.load_events(stream.clone(), None).await?;
//!     let expected = Version::new(loaded.len() as u64);
//!     store.append_events(stream, Some(expected), events).await?;
//! }
//! ```

pub mod environment;
pub mod event;
pub mod event_bus;
pub mod event_store;
pub mod stream;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
