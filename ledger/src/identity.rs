//! People, their roles, and donations.
//!
//! A person is one identity record that can wear several hats: the same
//! person may donate, receive a transfusion and work a shift at a collection
//! site. Roles are attachments on the identity, not separate record types.

use crate::types::{DonationId, FacilityId, PersonId, StaffId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A capability attached to a person.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Gives blood
    Donor,
    /// Receives blood products
    Patient,
    /// Works at a facility and can act on units
    Staff {
        /// Staff identifier used as the actor on ledger events
        staff_id: StaffId,
        /// Facility the staff member belongs to
        facility_id: FacilityId,
    },
}

/// Immutable personal record with its role attachments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Person identifier
    pub id: PersonId,
    /// Given name
    pub given_name: String,
    /// Family name
    pub family_name: String,
    /// Date of birth
    pub birth_date: NaiveDate,
    roles: BTreeSet<Role>,
}

impl Person {
    /// Creates a person with no roles
    #[must_use]
    pub fn new(
        id: PersonId,
        given_name: impl Into<String>,
        family_name: impl Into<String>,
        birth_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            given_name: given_name.into(),
            family_name: family_name.into(),
            birth_date,
            roles: BTreeSet::new(),
        }
    }

    /// Returns a copy of this person with an extra role attached.
    #[must_use]
    pub fn with_role(mut self, role: Role) -> Self {
        self.roles.insert(role);
        self
    }

    /// All attached roles.
    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.roles.iter()
    }

    /// Whether the person can donate.
    #[must_use]
    pub fn is_donor(&self) -> bool {
        self.roles.contains(&Role::Donor)
    }

    /// Whether the person can receive blood products.
    #[must_use]
    pub fn is_patient(&self) -> bool {
        self.roles.contains(&Role::Patient)
    }

    /// Staff identifiers this person acts under, one per facility.
    pub fn staff_ids(&self) -> impl Iterator<Item = StaffId> + '_ {
        self.roles.iter().filter_map(|role| match role {
            Role::Staff { staff_id, .. } => Some(*staff_id),
            Role::Donor | Role::Patient => None,
        })
    }
}

/// One collection event. Owned by exactly one donor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    /// Donation identifier
    pub id: DonationId,
    /// The donor
    pub donor_id: PersonId,
    /// Where it was collected
    pub facility_id: FacilityId,
    /// When it was collected
    pub collected_at: DateTime<Utc>,
}

impl Donation {
    /// Creates a donation record with a fresh identifier
    #[must_use]
    pub fn new(donor_id: PersonId, facility_id: FacilityId, collected_at: DateTime<Utc>) -> Self {
        Self {
            id: DonationId::new(),
            donor_id,
            facility_id,
            collected_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn birth_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(1988, 4, 2).unwrap_or_default()
    }

    #[test]
    fn one_person_many_hats() {
        let staff_id = StaffId::new();
        let person = Person::new(PersonId::new(), "Asha", "Rao", birth_date())
            .with_role(Role::Donor)
            .with_role(Role::Staff {
                staff_id,
                facility_id: FacilityId::new(),
            });

        assert!(person.is_donor());
        assert!(!person.is_patient());
        assert_eq!(person.staff_ids().collect::<Vec<_>>(), vec![staff_id]);
        assert_eq!(person.roles().count(), 2);
    }

    #[test]
    fn attaching_same_role_twice_is_a_no_op() {
        let person = Person::new(PersonId::new(), "Lee", "Chen", birth_date())
            .with_role(Role::Patient)
            .with_role(Role::Patient);
        assert_eq!(person.roles().count(), 1);
    }
}
