//! # BloodTrack Unit Ledger
//!
//! Lifecycle and provenance ledger for donated blood units.
//!
//! Each unit's history is an append-only event stream. Its status is never
//! stored; it is whatever the latest transition in the stream says. Lab
//! results are attached as immutable facts and a fixed rule decides whether
//! they release or quarantine the unit.
//!
//! ```text
//!          ┌──────────┐
//!          │   NEW    │
//!          └────┬─────┘
//!               │ begin_testing
//!          ┌────▼─────┐ evaluate ┌─────────────┐
//!          │ TESTING  ├─────────►│ QUARANTINED │
//!          └────┬─────┘          └─────────────┘
//!               │ evaluate
//!          ┌────▼─────┐
//!          │ RELEASED │
//!          └──────────┘
//!
//!  any non-terminal ──expire──► EXPIRED
//!  any non-terminal ──discard─► DISCARDED
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use bloodtrack_ledger::{
//!     Actor, ComponentType, Donation, FacilityId, InMemoryDonationRegistry, LedgerConfig,
//!     PersonId, UnitLedger, UnitStatus,
//! };
//! use bloodtrack_core::environment::Clock;
//! use bloodtrack_testing::{InMemoryEventStore, test_clock};
//! use chrono::Duration;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), bloodtrack_ledger::LedgerError> {
//! let clock = test_clock();
//! let donations = InMemoryDonationRegistry::new();
//! let donation = donations.insert(Donation::new(PersonId::new(), FacilityId::new(), clock.now()));
//!
//! let ledger = UnitLedger::new(
//!     Arc::new(InMemoryEventStore::new()),
//!     Arc::new(clock.clone()),
//!     Arc::new(donations),
//!     LedgerConfig::default(),
//! );
//!
//! let unit = ledger
//!     .register_unit(donation, ComponentType::RedCells, clock.now() + Duration::days(42))
//!     .await?;
//! ledger.begin_testing(unit, Actor::System).await?;
//! assert_eq!(ledger.current_status(unit).await?, UnitStatus::Testing);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod donations;
pub mod error;
pub mod events;
pub mod health;
pub mod identity;
pub mod lab;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
pub mod retry;
pub mod types;
pub mod unit;

pub use config::LedgerConfig;
pub use donations::{DonationRegistry, InMemoryDonationRegistry};
pub use error::LedgerError;
pub use events::{InventoryEvent, UnitEvent};
pub use health::PingResponse;
pub use identity::{Donation, Person, Role};
pub use lab::{
    AboGroup, BloodType, DataQualityWarning, ReleasePolicy, ResultStatus, RhFactor, ScreeningResult,
    TestCode, TypingResult,
};
pub use ledger::{EvaluationOutcome, UnitLedger};
pub use lifecycle::{TransitionReason, UnitStatus};
pub use retry::{RetryPolicy, retry_on_conflict};
pub use types::{Actor, ComponentType, DonationId, FacilityId, PersonId, Provenance, StaffId, UnitId};
pub use unit::BloodUnit;
