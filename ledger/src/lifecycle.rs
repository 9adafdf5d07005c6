//! Unit status state machine.
//!
//! ```text
//! NEW ──► TESTING ──┬──► RELEASED
//!                   └──► QUARANTINED
//!
//! NEW | TESTING | QUARANTINED ──► EXPIRED
//! NEW | TESTING | QUARANTINED ──► DISCARDED
//! ```
//!
//! Every transition the ledger appends is checked against [`ALLOWED`]. The
//! table is the single place legality is decided.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a blood unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitStatus {
    /// Registered, lab work not started
    New,
    /// Lab work in progress
    Testing,
    /// Cleared for use
    Released,
    /// Held back after a failed or inconclusive screen
    Quarantined,
    /// Past its expiration timestamp
    Expired,
    /// Manually removed from inventory
    Discarded,
}

impl UnitStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::New,
        Self::Testing,
        Self::Released,
        Self::Quarantined,
        Self::Expired,
        Self::Discarded,
    ];

    /// Terminal statuses accept no further transitions or lab results.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Released | Self::Expired | Self::Discarded)
    }

    /// Upper-case name as used in audit exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Testing => "TESTING",
            Self::Released => "RELEASED",
            Self::Quarantined => "QUARANTINED",
            Self::Expired => "EXPIRED",
            Self::Discarded => "DISCARDED",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionReason {
    /// Unit created from a donation
    Registered,
    /// Lab work began
    LabStarted,
    /// Every attached result passed
    LabPassed,
    /// A screening result failed or was indeterminate
    LabFailed,
    /// Expiration timestamp passed
    Expired,
    /// Held pending re-test. Reserved for hold policies; no ledger operation emits it.
    ManualHold,
    /// Manually discarded
    Discarded,
}

impl TransitionReason {
    /// Upper-case name as used in audit exports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::LabStarted => "LAB_STARTED",
            Self::LabPassed => "LAB_PASSED",
            Self::LabFailed => "LAB_FAILED",
            Self::Expired => "EXPIRED",
            Self::ManualHold => "MANUAL_HOLD",
            Self::Discarded => "DISCARDED",
        }
    }
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal `(from, to)` pairs. Anything absent is illegal.
pub const ALLOWED: &[(UnitStatus, UnitStatus)] = &[
    (UnitStatus::New, UnitStatus::Testing),
    (UnitStatus::New, UnitStatus::Expired),
    (UnitStatus::New, UnitStatus::Discarded),
    (UnitStatus::Testing, UnitStatus::Released),
    (UnitStatus::Testing, UnitStatus::Quarantined),
    (UnitStatus::Testing, UnitStatus::Expired),
    (UnitStatus::Testing, UnitStatus::Discarded),
    (UnitStatus::Quarantined, UnitStatus::Expired),
    (UnitStatus::Quarantined, UnitStatus::Discarded),
];

/// Whether `from → to` appears in the adjacency table.
#[must_use]
pub fn is_allowed(from: UnitStatus, to: UnitStatus) -> bool {
    ALLOWED.iter().any(|&(f, t)| f == from && t == to)
}

/// Statuses reachable in one step from `from`.
pub fn successors(from: UnitStatus) -> impl Iterator<Item = UnitStatus> {
    ALLOWED
        .iter()
        .filter(move |(f, _)| *f == from)
        .map(|&(_, t)| t)
}
