//! The unit lifecycle ledger service.
//!
//! Every mutating operation follows the same shape:
//!
//! 1. load the unit's stream and replay it into a [`BloodUnit`]
//! 2. validate the command against the replayed state
//! 3. append exactly one event, expecting the version that was loaded
//! 4. on a status transition, publish it (best effort)
//!
//! If another writer appended in between, step 3 fails with
//! [`LedgerError::ConcurrentModification`] and nothing is written. Wrap the
//! call in [`retry_on_conflict`](crate::retry::retry_on_conflict) to re-run it
//! against fresh state.

use crate::config::LedgerConfig;
use crate::donations::DonationRegistry;
use crate::error::LedgerError;
use crate::events::{InventoryEvent, UnitEvent, unit_stream};
use crate::health::PingResponse;
use crate::lab::{DataQualityWarning, ScreeningResult, TestCode, TypingResult, Verdict};
use crate::lifecycle::{TransitionReason, UnitStatus};
use crate::metrics::LedgerMetrics;
use crate::types::{Actor, ComponentType, DonationId, UnitId};
use crate::unit::BloodUnit;
use bloodtrack_core::environment::Clock;
use bloodtrack_core::event::SerializedEvent;
use bloodtrack_core::event_bus::EventBus;
use bloodtrack_core::event_store::EventStore;
use bloodtrack_core::stream::Version;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Result of [`UnitLedger::evaluate_and_transition`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EvaluationOutcome {
    /// The transition appended, or `None` if results are still pending
    pub event: Option<InventoryEvent>,
    /// Data-quality findings; never block release
    pub warnings: Vec<DataQualityWarning>,
}

/// Append-only ledger of blood-unit lifecycles.
///
/// Cheap to share behind an `Arc`; holds no per-unit state of its own.
pub struct UnitLedger {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    donations: Arc<dyn DonationRegistry>,
    bus: Option<Arc<dyn EventBus>>,
    config: LedgerConfig,
}

impl UnitLedger {
    /// Create a ledger without event publication.
    #[must_use]
    pub fn new(
        store: Arc<dyn EventStore>,
        clock: Arc<dyn Clock>,
        donations: Arc<dyn DonationRegistry>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            donations,
            bus: None,
            config,
        }
    }

    /// Publish status transitions to `bus` (if enabled in the config).
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Liveness probe.
    #[must_use]
    pub fn ping(&self) -> PingResponse {
        PingResponse::ok(&self.config.service_name)
    }

    /// Configured service name.
    #[must_use]
    pub fn whoami(&self) -> &str {
        &self.config.service_name
    }

    /// Create a unit in NEW from a known donation.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidDonationReference`] if the registry does not
    ///   know `donation_id`
    /// - [`LedgerError::Registry`] if the registry cannot be queried
    /// - [`LedgerError::Storage`] / [`LedgerError::Serialization`] on
    ///   infrastructure failure
    #[tracing::instrument(skip_all, fields(donation_id = %donation_id, component = %component))]
    pub async fn register_unit(
        &self,
        donation_id: DonationId,
        component: ComponentType,
        expires_at: DateTime<Utc>,
    ) -> Result<UnitId, LedgerError> {
        let result = self.try_register(donation_id, component, expires_at).await;
        if let Err(error) = &result {
            self.rejected("register_unit", None, error);
        }
        result
    }

    async fn try_register(
        &self,
        donation_id: DonationId,
        component: ComponentType,
        expires_at: DateTime<Utc>,
    ) -> Result<UnitId, LedgerError> {
        let known = self
            .donations
            .donation_exists(donation_id)
            .await
            .map_err(LedgerError::Registry)?;
        if !known {
            return Err(LedgerError::InvalidDonationReference(donation_id));
        }

        let unit_id = UnitId::new();
        let transition = InventoryEvent {
            unit_id,
            from_status: None,
            to_status: UnitStatus::New,
            reason: TransitionReason::Registered,
            actor: Actor::System,
            occurred_at: self.clock.now(),
            note: None,
        };
        let event = UnitEvent::UnitRegistered {
            donation_id,
            component,
            expires_at,
            transition: transition.clone(),
        };

        self.append(unit_id, Version::INITIAL, &event).await?;
        self.transitioned(&transition);
        self.publish(&event).await;
        Ok(unit_id)
    }

    /// Move a unit from NEW to TESTING.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnitNotFound`] for an unknown unit
    /// - [`LedgerError::IllegalTransition`] unless the unit is NEW
    /// - [`LedgerError::ConcurrentModification`] if the unit changed meanwhile
    #[tracing::instrument(skip_all, fields(unit_id = %unit_id))]
    pub async fn begin_testing(&self, unit_id: UnitId, actor: Actor) -> Result<InventoryEvent, LedgerError> {
        let result: Result<InventoryEvent, LedgerError> = async {
            let unit = self.load(unit_id).await?;
            let event = unit.transition_to(
                UnitStatus::Testing,
                TransitionReason::LabStarted,
                actor,
                self.clock.now(),
                None,
            )?;
            self.commit_transition(&unit, event).await
        }
        .await;
        self.observe("begin_testing", unit_id, result)
    }

    /// Attach a typing result. Does not change the unit's status.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnitNotFound`] for an unknown unit
    /// - [`LedgerError::UnitNotInTesting`] unless the unit is TESTING
    /// - [`LedgerError::ConcurrentModification`] if the unit changed meanwhile
    #[tracing::instrument(skip_all, fields(unit_id = %unit_id, blood_type = %result.blood_type))]
    pub async fn record_typing_result(&self, unit_id: UnitId, result: TypingResult) -> Result<(), LedgerError> {
        let outcome: Result<(), LedgerError> = async {
            let unit = self.load(unit_id).await?;
            unit.ensure_testing()?;
            let event = UnitEvent::TypingResultRecorded { unit_id, result };
            self.append(unit_id, unit.version(), &event).await?;
            Ok(())
        }
        .await;
        let outcome = self.observe("record_typing_result", unit_id, outcome);
        if outcome.is_ok() {
            LedgerMetrics::record_lab_result("typing");
            tracing::info!(unit_id = %unit_id, "Typing result recorded");
        }
        outcome
    }

    /// Attach a screening result. Does not change the unit's status.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnitNotFound`] for an unknown unit
    /// - [`LedgerError::UnitNotInTesting`] unless the unit is TESTING
    /// - [`LedgerError::DuplicateScreeningResult`] if the test code is already
    ///   attached
    /// - [`LedgerError::ConcurrentModification`] if the unit changed meanwhile
    #[tracing::instrument(skip_all, fields(unit_id = %unit_id, test_code = %result.test_code))]
    pub async fn record_screening_result(
        &self,
        unit_id: UnitId,
        result: ScreeningResult,
    ) -> Result<(), LedgerError> {
        let outcome: Result<(), LedgerError> = async {
            let unit = self.load(unit_id).await?;
            unit.ensure_testing()?;
            if unit.results.has_screening(&result.test_code) {
                return Err(LedgerError::DuplicateScreeningResult {
                    unit_id,
                    test_code: result.test_code,
                });
            }
            let event = UnitEvent::ScreeningResultRecorded { unit_id, result };
            self.append(unit_id, unit.version(), &event).await?;
            Ok(())
        }
        .await;
        let outcome = self.observe("record_screening_result", unit_id, outcome);
        if outcome.is_ok() {
            LedgerMetrics::record_lab_result("screening");
            tracing::info!(unit_id = %unit_id, "Screening result recorded");
        }
        outcome
    }

    /// Apply the release rule to a unit in TESTING.
    ///
    /// Appends TESTING→QUARANTINED (`LAB_FAILED`) or TESTING→RELEASED
    /// (`LAB_PASSED`), or nothing while results are still pending.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnitNotFound`] for an unknown unit
    /// - [`LedgerError::UnitNotInTesting`] unless the unit is TESTING
    /// - [`LedgerError::ConcurrentModification`] if the unit changed meanwhile
    #[tracing::instrument(skip_all, fields(unit_id = %unit_id))]
    pub async fn evaluate_and_transition(
        &self,
        unit_id: UnitId,
        actor: Actor,
    ) -> Result<EvaluationOutcome, LedgerError> {
        let result: Result<EvaluationOutcome, LedgerError> = async {
            let unit = self.load(unit_id).await?;
            unit.ensure_testing()?;

            let evaluation = unit.results.evaluate(self.config.release_policy);
            for warning in &evaluation.warnings {
                tracing::warn!(unit_id = %unit_id, %warning, "Data quality warning");
            }

            let (to, reason, note) = match evaluation.verdict {
                Verdict::Release => (UnitStatus::Released, TransitionReason::LabPassed, None),
                Verdict::Quarantine { failing } => (
                    UnitStatus::Quarantined,
                    TransitionReason::LabFailed,
                    Some(format!("disqualifying screening: {}", join_codes(&failing))),
                ),
                Verdict::Pending => {
                    tracing::debug!(unit_id = %unit_id, "Results pending, no transition");
                    return Ok(EvaluationOutcome {
                        event: None,
                        warnings: evaluation.warnings,
                    });
                },
            };

            let event = unit.transition_to(to, reason, actor, self.clock.now(), note)?;
            let event = self.commit_transition(&unit, event).await?;
            Ok(EvaluationOutcome {
                event: Some(event),
                warnings: evaluation.warnings,
            })
        }
        .await;
        self.observe("evaluate_and_transition", unit_id, result)
    }

    /// Expire a unit whose expiration has passed.
    ///
    /// Calling this on an already-EXPIRED unit returns the existing expiry
    /// event and appends nothing.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnitNotFound`] for an unknown unit
    /// - [`LedgerError::IllegalTransition`] if the unit is RELEASED or
    ///   DISCARDED, or its expiration has not been passed yet
    /// - [`LedgerError::ConcurrentModification`] if the unit changed meanwhile
    #[tracing::instrument(skip_all, fields(unit_id = %unit_id))]
    pub async fn expire(&self, unit_id: UnitId) -> Result<InventoryEvent, LedgerError> {
        let result: Result<InventoryEvent, LedgerError> = async {
            let unit = self.load(unit_id).await?;
            let now = self.clock.now();

            if unit.status() == UnitStatus::Expired {
                tracing::debug!(unit_id = %unit_id, "Unit already expired");
                return unit.last_transition().cloned().ok_or_else(|| LedgerError::CorruptStream {
                    unit_id,
                    reason: "expired unit without transitions".to_string(),
                });
            }

            if !unit.is_expired_at(now) {
                return Err(LedgerError::IllegalTransition {
                    unit_id,
                    from: unit.status(),
                    to: UnitStatus::Expired,
                });
            }

            let event = unit.transition_to(
                UnitStatus::Expired,
                TransitionReason::Expired,
                Actor::System,
                now,
                None,
            )?;
            self.commit_transition(&unit, event).await
        }
        .await;
        self.observe("expire", unit_id, result)
    }

    /// Take a unit out of circulation by hand.
    ///
    /// `reason` is kept on the event as its note.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnitNotFound`] for an unknown unit
    /// - [`LedgerError::IllegalTransition`] if the unit is already terminal
    /// - [`LedgerError::ConcurrentModification`] if the unit changed meanwhile
    #[tracing::instrument(skip_all, fields(unit_id = %unit_id))]
    pub async fn discard(
        &self,
        unit_id: UnitId,
        actor: Actor,
        reason: impl Into<String> + Send,
    ) -> Result<InventoryEvent, LedgerError> {
        let reason = reason.into();
        let note = Some(reason.trim().to_string()).filter(|r| !r.is_empty());

        let result: Result<InventoryEvent, LedgerError> = async {
            let unit = self.load(unit_id).await?;
            let event = unit.transition_to(
                UnitStatus::Discarded,
                TransitionReason::Discarded,
                actor,
                self.clock.now(),
                note,
            )?;
            self.commit_transition(&unit, event).await
        }
        .await;
        self.observe("discard", unit_id, result)
    }

    /// Current status: the `to_status` of the latest transition.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnitNotFound`] if the unit has no events.
    pub async fn current_status(&self, unit_id: UnitId) -> Result<UnitStatus, LedgerError> {
        Ok(self.load(unit_id).await?.status())
    }

    /// Transition history, oldest first.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnitNotFound`] if the unit has no events.
    pub async fn history(&self, unit_id: UnitId) -> Result<Vec<InventoryEvent>, LedgerError> {
        Ok(self.load(unit_id).await?.history().to_vec())
    }

    /// Full read model of a unit.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnitNotFound`] if the unit has no events.
    pub async fn unit(&self, unit_id: UnitId) -> Result<BloodUnit, LedgerError> {
        self.load(unit_id).await
    }

    async fn load(&self, unit_id: UnitId) -> Result<BloodUnit, LedgerError> {
        let serialized = self
            .store
            .load_events(unit_stream(unit_id), None)
            .await
            .map_err(|e| LedgerError::from_store(unit_id, e))?;

        let events = serialized
            .iter()
            .map(SerializedEvent::decode::<UnitEvent>)
            .collect::<Result<Vec<_>, _>>()?;

        let unit = BloodUnit::replay(unit_id, events)?.ok_or(LedgerError::UnitNotFound(unit_id))?;
        tracing::debug!(
            unit_id = %unit_id,
            version = %unit.version(),
            status = %unit.status(),
            "Unit loaded"
        );
        Ok(unit)
    }

    async fn append(&self, unit_id: UnitId, expected: Version, event: &UnitEvent) -> Result<Version, LedgerError> {
        let serialized = event.to_serialized()?;
        let started = Instant::now();
        let version = self
            .store
            .append_events(unit_stream(unit_id), Some(expected), vec![serialized])
            .await
            .map_err(|e| LedgerError::from_store(unit_id, e))?;
        LedgerMetrics::record_append(started.elapsed());
        Ok(version)
    }

    async fn commit_transition(
        &self,
        unit: &BloodUnit,
        transition: InventoryEvent,
    ) -> Result<InventoryEvent, LedgerError> {
        let event = UnitEvent::StatusChanged(transition.clone());
        self.append(unit.id, unit.version(), &event).await?;

        self.transitioned(&transition);
        self.publish(&event).await;
        Ok(transition)
    }

    fn transitioned(&self, transition: &InventoryEvent) {
        LedgerMetrics::record_transition(transition);
        tracing::info!(
            unit_id = %transition.unit_id,
            from = transition.from_status.map_or("-", UnitStatus::as_str),
            to = %transition.to_status,
            reason = %transition.reason,
            actor = %transition.actor,
            service = %self.config.service_name,
            "Unit status changed"
        );
    }

    async fn publish(&self, event: &UnitEvent) {
        let Some(bus) = self.bus.as_ref().filter(|_| self.config.publish_events) else {
            return;
        };

        let topic = &self.config.event_topic;
        let outcome = match event.to_serialized() {
            Ok(serialized) => bus.publish(topic, &serialized).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        if let Err(error) = outcome {
            LedgerMetrics::record_publish_error();
            tracing::warn!(
                unit_id = %event.unit_id(),
                topic = %topic,
                error = %error,
                "Failed to publish unit event"
            );
        }
    }

    fn observe<T>(
        &self,
        operation: &'static str,
        unit_id: UnitId,
        result: Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        if let Err(error) = &result {
            self.rejected(operation, Some(unit_id), error);
        }
        result
    }

    fn rejected(&self, operation: &'static str, unit_id: Option<UnitId>, error: &LedgerError) {
        LedgerMetrics::record_failure(error);
        let unit_id = unit_id.map(|id| id.to_string());
        tracing::warn!(
            operation,
            unit_id = unit_id.as_deref().unwrap_or("-"),
            kind = error.kind(),
            error = %error,
            service = %self.config.service_name,
            "Ledger command rejected"
        );
    }
}

fn join_codes(codes: &[TestCode]) -> String {
    codes.iter().map(TestCode::as_str).collect::<Vec<_>>().join(", ")
}
