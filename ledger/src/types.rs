//! Identifiers and small value types shared across the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from a UUID
            #[must_use]
            pub const fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Returns the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a blood unit
    UnitId
);
uuid_id!(
    /// Identifier of a donation (collection event)
    DonationId
);
uuid_id!(
    /// Identifier of a person record
    PersonId
);
uuid_id!(
    /// Identifier of a staff member acting on a unit
    StaffId
);
uuid_id!(
    /// Identifier of a collection site or laboratory
    FacilityId
);

/// Blood component a unit holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    /// Whole blood, unseparated
    WholeBlood,
    /// Packed red blood cells
    RedCells,
    /// Platelet concentrate
    Platelets,
    /// Plasma
    Plasma,
    /// Cryoprecipitated antihemophilic factor
    Cryoprecipitate,
}

impl ComponentType {
    /// Short label used on bag labels and in logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::WholeBlood => "WB",
            Self::RedCells => "RBC",
            Self::Platelets => "PLT",
            Self::Plasma => "FFP",
            Self::Cryoprecipitate => "CRYO",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a component code is not recognised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown component type: {0}")]
pub struct ParseComponentTypeError(String);

impl FromStr for ComponentType {
    type Err = ParseComponentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WB" | "WHOLE_BLOOD" => Ok(Self::WholeBlood),
            "RBC" | "RED_CELLS" => Ok(Self::RedCells),
            "PLT" | "PLATELETS" => Ok(Self::Platelets),
            "FFP" | "PLASMA" => Ok(Self::Plasma),
            "CRYO" | "CRYOPRECIPITATE" => Ok(Self::Cryoprecipitate),
            _ => Err(ParseComponentTypeError(s.to_string())),
        }
    }
}

/// Who performed a transition.
///
/// The ledger stores opaque references only; it never checks permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// A staff member
    Staff(StaffId),
    /// The ledger itself or a scheduler acting on its behalf
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staff(id) => write!(f, "staff:{id}"),
            Self::System => f.write_str("system"),
        }
    }
}

impl From<StaffId> for Actor {
    fn from(id: StaffId) -> Self {
        Self::Staff(id)
    }
}

/// Where and by whom a lab finding was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Facility that produced the finding
    pub facility_id: FacilityId,
    /// Staff member who signed it off
    pub staff_id: StaffId,
    /// When it was produced
    pub recorded_at: DateTime<Utc>,
}

impl Provenance {
    /// Creates a provenance record
    #[must_use]
    pub const fn new(facility_id: FacilityId, staff_id: StaffId, recorded_at: DateTime<Utc>) -> Self {
        Self {
            facility_id,
            staff_id,
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_codes_parse_back() {
        for component in [
            ComponentType::WholeBlood,
            ComponentType::RedCells,
            ComponentType::Platelets,
            ComponentType::Plasma,
            ComponentType::Cryoprecipitate,
        ] {
            assert_eq!(component.code().parse::<ComponentType>(), Ok(component));
        }
    }

    #[test]
    fn component_parse_is_case_insensitive() {
        assert_eq!("rbc".parse::<ComponentType>(), Ok(ComponentType::RedCells));
        assert!("granulocytes".parse::<ComponentType>().is_err());
    }

    #[test]
    fn actor_display() {
        assert_eq!(Actor::System.to_string(), "system");
        let staff = StaffId::new();
        assert_eq!(Actor::from(staff).to_string(), format!("staff:{staff}"));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(UnitId::new(), UnitId::new());
    }
}
