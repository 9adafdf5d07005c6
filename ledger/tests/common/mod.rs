//! Shared fixture for ledger integration tests.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use bloodtrack_core::environment::Clock;
use bloodtrack_core::event_store::EventStore;
use bloodtrack_ledger::{
    Actor, BloodType, ComponentType, Donation, DonationId, FacilityId, InMemoryDonationRegistry,
    LedgerConfig, PersonId, Provenance, ResultStatus, ScreeningResult, StaffId, TestCode,
    TypingResult, UnitId, UnitLedger,
};
use bloodtrack_testing::{InMemoryEventBus, InMemoryEventStore, ManualClock, test_epoch};
use chrono::Duration;
use std::sync::Arc;

/// Ledger wired to in-memory collaborators, with handles kept for assertions.
pub struct Harness {
    pub ledger: UnitLedger,
    pub store: InMemoryEventStore,
    pub clock: ManualClock,
    pub bus: InMemoryEventBus,
    pub donation: DonationId,
    pub facility: FacilityId,
    pub staff: StaffId,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        let store = InMemoryEventStore::new();
        Self::with_store(config, store.clone(), Arc::new(store))
    }

    /// Use `backend` for the ledger while keeping `store` as the inspection
    /// handle (they normally share the same streams).
    pub fn with_store(config: LedgerConfig, store: InMemoryEventStore, backend: Arc<dyn EventStore>) -> Self {
        let clock = ManualClock::new(test_epoch());
        let bus = InMemoryEventBus::new();
        let donations = InMemoryDonationRegistry::new();
        let facility = FacilityId::new();
        let donation = donations.insert(Donation::new(PersonId::new(), facility, clock.now()));

        let ledger = UnitLedger::new(backend, Arc::new(clock.clone()), Arc::new(donations), config)
            .with_event_bus(Arc::new(bus.clone()));

        Self {
            ledger,
            store,
            clock,
            bus,
            donation,
            facility,
            staff: StaffId::new(),
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::Staff(self.staff)
    }

    pub fn provenance(&self) -> Provenance {
        Provenance::new(self.facility, self.staff, self.clock.now())
    }

    pub fn screening(&self, code: &str, status: ResultStatus) -> ScreeningResult {
        ScreeningResult::new(TestCode::new(code).unwrap(), status, self.provenance())
    }

    pub fn typing(&self, blood_type: BloodType, status: ResultStatus) -> TypingResult {
        TypingResult::new("gel-card", blood_type, status, self.provenance())
    }

    /// Register a red-cell unit expiring `days` from now.
    pub async fn register(&self, days: i64) -> UnitId {
        self.ledger
            .register_unit(self.donation, ComponentType::RedCells, self.clock.now() + Duration::days(days))
            .await
            .expect("register unit")
    }

    /// Register a unit and move it to TESTING.
    pub async fn unit_in_testing(&self) -> UnitId {
        let unit_id = self.register(42).await;
        self.ledger
            .begin_testing(unit_id, self.actor())
            .await
            .expect("begin testing");
        unit_id
    }
}
