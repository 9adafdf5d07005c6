//! Events stored in a unit's stream.
//!
//! A unit stream (`unit-<uuid>`) contains, in append order:
//!
//! 1. exactly one `UnitRegistered` (carries the `→ NEW` transition)
//! 2. any mix of `TypingResultRecorded`, `ScreeningResultRecorded` and
//!    `StatusChanged`
//!
//! The [`InventoryEvent`]s inside `UnitRegistered` and `StatusChanged` form
//! the unit's audit history. The last one's `to_status` is the unit's status.

use crate::lab::{ScreeningResult, TypingResult};
use crate::lifecycle::{TransitionReason, UnitStatus};
use crate::types::{Actor, ComponentType, DonationId, UnitId};
use bloodtrack_core::event::{Event, EventError, SerializedEvent};
use bloodtrack_core::stream::StreamId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stream holding everything about one unit.
#[must_use]
pub fn unit_stream(unit_id: UnitId) -> StreamId {
    StreamId::new(format!("unit-{unit_id}"))
}

/// Immutable record of one status transition.
///
/// This is also the payload published to the notification layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEvent {
    /// Unit the transition applies to
    pub unit_id: UnitId,
    /// Status before; `None` only for registration
    pub from_status: Option<UnitStatus>,
    /// Status after
    pub to_status: UnitStatus,
    /// Why
    pub reason: TransitionReason,
    /// Who
    pub actor: Actor,
    /// When
    pub occurred_at: DateTime<Utc>,
    /// Free text: the caller's discard reason, or the disqualifying tests on
    /// quarantine
    pub note: Option<String>,
}

/// Everything that can happen to a unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitEvent {
    /// Unit created from a donation, in status NEW.
    UnitRegistered {
        /// Donation the unit came from
        donation_id: DonationId,
        /// Component held
        component: ComponentType,
        /// When the unit stops being usable
        expires_at: DateTime<Utc>,
        /// The `→ NEW` transition
        transition: InventoryEvent,
    },
    /// Typing result attached.
    TypingResultRecorded {
        /// Unit
        unit_id: UnitId,
        /// The finding
        result: TypingResult,
    },
    /// Screening result attached.
    ScreeningResultRecorded {
        /// Unit
        unit_id: UnitId,
        /// The finding
        result: ScreeningResult,
    },
    /// Status moved.
    StatusChanged(InventoryEvent),
}

impl UnitEvent {
    /// The transition carried by this event, if any.
    #[must_use]
    pub const fn transition(&self) -> Option<&InventoryEvent> {
        match self {
            Self::UnitRegistered { transition, .. } | Self::StatusChanged(transition) => {
                Some(transition)
            },
            Self::TypingResultRecorded { .. } | Self::ScreeningResultRecorded { .. } => None,
        }
    }

    /// Unit this event belongs to.
    #[must_use]
    pub const fn unit_id(&self) -> UnitId {
        match self {
            Self::UnitRegistered { transition, .. } | Self::StatusChanged(transition) => {
                transition.unit_id
            },
            Self::TypingResultRecorded { unit_id, .. }
            | Self::ScreeningResultRecorded { unit_id, .. } => *unit_id,
        }
    }

    /// Serialize for the event store, with unit and actor in the metadata.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if bincode fails.
    pub fn to_serialized(&self) -> Result<SerializedEvent, EventError> {
        let mut metadata = serde_json::json!({ "unit_id": self.unit_id().to_string() });
        if let Some(transition) = self.transition() {
            metadata["actor"] = serde_json::Value::String(transition.actor.to_string());
            metadata["to_status"] = serde_json::Value::String(transition.to_status.to_string());
        }
        SerializedEvent::from_event(self, Some(metadata))
    }
}

impl Event for UnitEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::UnitRegistered { .. } => "UnitRegistered.v1",
            Self::TypingResultRecorded { .. } => "TypingResultRecorded.v1",
            Self::ScreeningResultRecorded { .. } => "ScreeningResultRecorded.v1",
            Self::StatusChanged(_) => "StatusChanged.v1",
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::types::StaffId;

    fn transition(unit_id: UnitId) -> InventoryEvent {
        InventoryEvent {
            unit_id,
            from_status: Some(UnitStatus::New),
            to_status: UnitStatus::Testing,
            reason: TransitionReason::LabStarted,
            actor: Actor::Staff(StaffId::new()),
            occurred_at: Utc::now(),
            note: None,
        }
    }

    #[test]
    fn stream_name_uses_unit_prefix() {
        let unit_id = UnitId::new();
        assert_eq!(unit_stream(unit_id).as_str(), format!("unit-{unit_id}"));
    }

    #[test]
    fn status_change_survives_the_store_format() {
        let unit_id = UnitId::new();
        let event = UnitEvent::StatusChanged(transition(unit_id));

        let serialized = event.to_serialized().expect("serialize");
        assert_eq!(serialized.event_type, "StatusChanged.v1");

        let metadata = serialized.metadata.clone().expect("metadata");
        assert_eq!(metadata["unit_id"], unit_id.to_string());
        assert_eq!(metadata["to_status"], "TESTING");

        let decoded: UnitEvent = serialized.decode().expect("decode");
        assert_eq!(decoded, event);
    }

    #[test]
    fn lab_events_carry_no_transition() {
        use crate::lab::{ResultStatus, ScreeningResult, TestCode};
        use crate::types::{FacilityId, Provenance};

        let unit_id = UnitId::new();
        let event = UnitEvent::ScreeningResultRecorded {
            unit_id,
            result: ScreeningResult::new(
                TestCode::new("HIV").expect("code"),
                ResultStatus::Passed,
                Provenance::new(FacilityId::new(), StaffId::new(), Utc::now()),
            ),
        };
        assert!(event.transition().is_none());
        assert_eq!(event.unit_id(), unit_id);
    }
}
