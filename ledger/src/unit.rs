//! Blood-unit aggregate.
//!
//! A [`BloodUnit`] is never stored. It is rebuilt by replaying the unit's
//! stream, checked against the command, and thrown away. The only thing
//! written is the next event.

use crate::error::LedgerError;
use crate::events::{InventoryEvent, UnitEvent};
use crate::lab::LabResults;
use crate::lifecycle::{self, TransitionReason, UnitStatus};
use crate::types::{Actor, ComponentType, DonationId, UnitId};
use bloodtrack_core::stream::Version;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Read model of one unit, rebuilt from its events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BloodUnit {
    /// Unit identifier
    pub id: UnitId,
    /// Donation it came from
    pub donation_id: DonationId,
    /// Component held
    pub component: ComponentType,
    /// When it stops being usable
    pub expires_at: DateTime<Utc>,
    /// Attached lab results
    pub results: LabResults,
    history: Vec<InventoryEvent>,
    version: Version,
}

impl BloodUnit {
    /// Rebuild a unit from its stream, oldest event first.
    ///
    /// Returns `Ok(None)` for an empty stream.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CorruptStream`] if the stream does not start
    /// with a registration, registers twice, or mixes units.
    pub fn replay<I>(unit_id: UnitId, events: I) -> Result<Option<Self>, LedgerError>
    where
        I: IntoIterator<Item = UnitEvent>,
    {
        let mut events = events.into_iter();
        let Some(first) = events.next() else {
            return Ok(None);
        };

        let mut unit = match first {
            UnitEvent::UnitRegistered {
                donation_id,
                component,
                expires_at,
                transition,
            } if transition.unit_id == unit_id => Self {
                id: unit_id,
                donation_id,
                component,
                expires_at,
                results: LabResults::default(),
                history: vec![transition],
                version: Version::new(1),
            },
            other => {
                return Err(LedgerError::CorruptStream {
                    unit_id,
                    reason: format!("stream starts with {other:?} instead of this unit's registration"),
                });
            },
        };

        for event in events {
            unit.apply(event)?;
        }
        Ok(Some(unit))
    }

    /// Apply one stored event.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CorruptStream`] for a second registration or an
    /// event belonging to another unit.
    pub fn apply(&mut self, event: UnitEvent) -> Result<(), LedgerError> {
        if event.unit_id() != self.id {
            return Err(LedgerError::CorruptStream {
                unit_id: self.id,
                reason: format!("event for unit {} in this stream", event.unit_id()),
            });
        }

        match event {
            UnitEvent::UnitRegistered { .. } => {
                return Err(LedgerError::CorruptStream {
                    unit_id: self.id,
                    reason: "unit registered twice".to_string(),
                });
            },
            UnitEvent::TypingResultRecorded { result, .. } => self.results.typing.push(result),
            UnitEvent::ScreeningResultRecorded { result, .. } => {
                self.results.screening.push(result);
            },
            UnitEvent::StatusChanged(transition) => self.history.push(transition),
        }
        self.version = self.version.next();
        Ok(())
    }

    /// Current status: the `to_status` of the latest transition.
    #[must_use]
    pub fn status(&self) -> UnitStatus {
        self.history
            .last()
            .map_or(UnitStatus::New, |event| event.to_status)
    }

    /// Transition history, oldest first.
    #[must_use]
    pub fn history(&self) -> &[InventoryEvent] {
        &self.history
    }

    /// Latest transition.
    #[must_use]
    pub fn last_transition(&self) -> Option<&InventoryEvent> {
        self.history.last()
    }

    /// Number of events in the unit's stream; the expected version for the
    /// next append.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// Whether `now` is past the expiration timestamp.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Fail unless the unit is in TESTING.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnitNotInTesting`] otherwise.
    pub fn ensure_testing(&self) -> Result<(), LedgerError> {
        match self.status() {
            UnitStatus::Testing => Ok(()),
            status => Err(LedgerError::UnitNotInTesting {
                unit_id: self.id,
                status,
            }),
        }
    }

    /// Build the next transition if the adjacency table allows it.
    ///
    /// The timestamp never goes backwards relative to the previous transition.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::IllegalTransition`] if `current → to` is not
    /// allowed.
    pub fn transition_to(
        &self,
        to: UnitStatus,
        reason: TransitionReason,
        actor: Actor,
        now: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<InventoryEvent, LedgerError> {
        let from = self.status();
        if !lifecycle::is_allowed(from, to) {
            return Err(LedgerError::IllegalTransition {
                unit_id: self.id,
                from,
                to,
            });
        }

        let occurred_at = self
            .last_transition()
            .map_or(now, |last| now.max(last.occurred_at));

        Ok(InventoryEvent {
            unit_id: self.id,
            from_status: Some(from),
            to_status: to,
            reason,
            actor,
            occurred_at,
            note,
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::lab::{ResultStatus, ScreeningResult, TestCode};
    use crate::types::{FacilityId, Provenance, StaffId};
    use chrono::Duration;

    fn registration(unit_id: UnitId, at: DateTime<Utc>) -> UnitEvent {
        UnitEvent::UnitRegistered {
            donation_id: DonationId::new(),
            component: ComponentType::RedCells,
            expires_at: at + Duration::days(35),
            transition: InventoryEvent {
                unit_id,
                from_status: None,
                to_status: UnitStatus::New,
                reason: TransitionReason::Registered,
                actor: Actor::System,
                occurred_at: at,
                note: None,
            },
        }
    }

    fn registered(at: DateTime<Utc>) -> BloodUnit {
        let unit_id = UnitId::new();
        BloodUnit::replay(unit_id, [registration(unit_id, at)])
            .unwrap()
            .expect("unit")
    }

    #[test]
    fn empty_stream_is_no_unit() {
        assert!(BloodUnit::replay(UnitId::new(), []).unwrap().is_none());
    }

    #[test]
    fn registration_starts_in_new_at_version_one() {
        let unit = registered(Utc::now());
        assert_eq!(unit.status(), UnitStatus::New);
        assert_eq!(unit.version(), Version::new(1));
        assert_eq!(unit.history().len(), 1);
    }

    #[test]
    fn stream_must_start_with_registration() {
        let unit_id = UnitId::new();
        let result = BloodUnit::replay(
            unit_id,
            [UnitEvent::StatusChanged(InventoryEvent {
                unit_id,
                from_status: Some(UnitStatus::New),
                to_status: UnitStatus::Testing,
                reason: TransitionReason::LabStarted,
                actor: Actor::System,
                occurred_at: Utc::now(),
                note: None,
            })],
        );
        assert!(matches!(result, Err(LedgerError::CorruptStream { .. })));
    }

    #[test]
    fn second_registration_is_corrupt() {
        let unit_id = UnitId::new();
        let now = Utc::now();
        let result = BloodUnit::replay(unit_id, [registration(unit_id, now), registration(unit_id, now)]);
        assert!(matches!(result, Err(LedgerError::CorruptStream { .. })));
    }

    #[test]
    fn lab_results_bump_version_but_not_status() {
        let mut unit = registered(Utc::now());
        let testing = unit
            .transition_to(UnitStatus::Testing, TransitionReason::LabStarted, Actor::System, Utc::now(), None)
            .unwrap();
        unit.apply(UnitEvent::StatusChanged(testing)).unwrap();

        unit.apply(UnitEvent::ScreeningResultRecorded {
            unit_id: unit.id,
            result: ScreeningResult::new(
                TestCode::new("HIV").unwrap(),
                ResultStatus::Passed,
                Provenance::new(FacilityId::new(), StaffId::new(), Utc::now()),
            ),
        })
        .unwrap();

        assert_eq!(unit.status(), UnitStatus::Testing);
        assert_eq!(unit.version(), Version::new(3));
        assert_eq!(unit.results.screening.len(), 1);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let unit = registered(Utc::now());
        let result = unit.transition_to(
            UnitStatus::Released,
            TransitionReason::LabPassed,
            Actor::System,
            Utc::now(),
            None,
        );
        assert!(matches!(
            result,
            Err(LedgerError::IllegalTransition {
                from: UnitStatus::New,
                to: UnitStatus::Released,
                ..
            })
        ));
    }

    #[test]
    fn transition_time_never_goes_backwards() {
        let registered_at = Utc::now();
        let unit = registered(registered_at);
        let event = unit
            .transition_to(
                UnitStatus::Testing,
                TransitionReason::LabStarted,
                Actor::System,
                registered_at - Duration::minutes(5),
                None,
            )
            .unwrap();
        assert_eq!(event.occurred_at, registered_at);
    }

    #[test]
    fn expiry_is_strictly_after_expiration() {
        let unit = registered(Utc::now());
        assert!(!unit.is_expired_at(unit.expires_at));
        assert!(unit.is_expired_at(unit.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn ensure_testing_reports_current_status() {
        let unit = registered(Utc::now());
        assert!(matches!(
            unit.ensure_testing(),
            Err(LedgerError::UnitNotInTesting {
                status: UnitStatus::New,
                ..
            })
        ));
    }
}
