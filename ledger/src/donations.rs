//! Donation lookups.
//!
//! The ledger does not own donation records. It only asks the collection
//! service whether a donation exists before registering a unit from it.

use crate::identity::Donation;
use crate::types::DonationId;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

/// Boxed future returned by [`DonationRegistry`].
pub type RegistryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send + 'a>>;

/// Read access to the donation/collection service.
pub trait DonationRegistry: Send + Sync {
    /// Whether a donation with this identifier exists.
    ///
    /// # Errors
    ///
    /// Returns a description of the failure if the registry cannot be queried.
    fn donation_exists(&self, donation_id: DonationId) -> RegistryFuture<'_, bool>;
}

/// `HashMap`-backed registry for tests and the demo binary.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDonationRegistry {
    donations: Arc<RwLock<HashMap<DonationId, Donation>>>,
}

impl InMemoryDonationRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a donation and return its identifier.
    pub fn insert(&self, donation: Donation) -> DonationId {
        let id = donation.id;
        self.donations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, donation);
        id
    }

    /// Look up a donation.
    #[must_use]
    pub fn get(&self, donation_id: DonationId) -> Option<Donation> {
        self.donations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&donation_id)
            .cloned()
    }
}

impl DonationRegistry for InMemoryDonationRegistry {
    fn donation_exists(&self, donation_id: DonationId) -> RegistryFuture<'_, bool> {
        Box::pin(async move { Ok(self.get(donation_id).is_some()) })
    }
}
