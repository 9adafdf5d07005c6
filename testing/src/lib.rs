//! # BloodTrack Testing
//!
//! In-memory implementations of the core traits.
//!
//! - [`InMemoryEventStore`]: `HashMap`-backed event store with real
//!   optimistic concurrency checks
//! - [`InMemoryEventBus`]: records every published event for assertions
//! - [`FixedClock`] / [`ManualClock`]: deterministic time
//!
//! ## Example
//!
//! ```
//! use bloodtrack_testing::{InMemoryEventStore, test_clock};
//! use bloodtrack_core::environment::Clock;
//!
//! let store = InMemoryEventStore::new();
//! assert_eq!(store.stream_count(), 0);
//!
//! let clock = test_clock();
//! assert_eq!(clock.now(), clock.now());
//! ```

pub mod event_bus;
pub mod event_store;
pub mod mocks;

// Re-export commonly used items
pub use event_bus::InMemoryEventBus;
pub use event_store::InMemoryEventStore;
pub use mocks::{FixedClock, ManualClock, test_clock, test_epoch};
