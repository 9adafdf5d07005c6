//! Ledger error type.

use crate::lab::TestCode;
use crate::lifecycle::UnitStatus;
use crate::types::{DonationId, UnitId};
use bloodtrack_core::event::EventError;
use bloodtrack_core::event_store::EventStoreError;
use thiserror::Error;

/// Errors returned by ledger operations.
///
/// All of them are local to one call. Only [`LedgerError::ConcurrentModification`]
/// is worth retrying; the rest mean the caller asked for something the unit's
/// current state does not allow, or a collaborator failed.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// No events exist for the unit.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The donation registry does not know the donation.
    #[error("Invalid donation reference: {0}")]
    InvalidDonationReference(DonationId),

    /// The requested transition is not in the adjacency table, or its
    /// precondition (e.g. expiration reached) does not hold.
    #[error("Illegal transition for unit {unit_id}: {from} -> {to}")]
    IllegalTransition {
        /// Unit
        unit_id: UnitId,
        /// Current status
        from: UnitStatus,
        /// Requested status
        to: UnitStatus,
    },

    /// Lab results can only be recorded or evaluated while TESTING.
    #[error("Unit {unit_id} is not in testing (status {status})")]
    UnitNotInTesting {
        /// Unit
        unit_id: UnitId,
        /// Current status
        status: UnitStatus,
    },

    /// Another operation appended to the unit after it was loaded.
    #[error("Concurrent modification of unit {0}; reload and retry")]
    ConcurrentModification(UnitId),

    /// A screening result with this test code is already attached.
    #[error("Unit {unit_id} already has a screening result for {test_code}")]
    DuplicateScreeningResult {
        /// Unit
        unit_id: UnitId,
        /// Test code
        test_code: TestCode,
    },

    /// The stored events do not form a valid unit history.
    #[error("Corrupt stream for unit {unit_id}: {reason}")]
    CorruptStream {
        /// Unit
        unit_id: UnitId,
        /// What is wrong
        reason: String,
    },

    /// The donation registry could not be queried.
    #[error("Donation registry error: {0}")]
    Registry(String),

    /// Event encoding or decoding failed.
    #[error(transparent)]
    Serialization(#[from] EventError),

    /// The event store failed for a reason other than a version conflict.
    #[error(transparent)]
    Storage(EventStoreError),
}

impl LedgerError {
    /// Whether retrying with fresh state can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }

    /// Short, stable label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnitNotFound(_) => "unit_not_found",
            Self::InvalidDonationReference(_) => "invalid_donation_reference",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::UnitNotInTesting { .. } => "unit_not_in_testing",
            Self::ConcurrentModification(_) => "concurrent_modification",
            Self::DuplicateScreeningResult { .. } => "duplicate_screening_result",
            Self::CorruptStream { .. } => "corrupt_stream",
            Self::Registry(_) => "registry",
            Self::Serialization(_) => "serialization",
            Self::Storage(_) => "storage",
        }
    }

    /// Map a store error for `unit_id`, turning version conflicts into
    /// [`LedgerError::ConcurrentModification`].
    #[must_use]
    pub fn from_store(unit_id: UnitId, error: EventStoreError) -> Self {
        match error {
            EventStoreError::ConcurrencyConflict { .. } => Self::ConcurrentModification(unit_id),
            other => Self::Storage(other),
        }
    }
}
