//! Site registration store
//!
//! The store is the single authority for registration state. Callers own the
//! domain-uniqueness policy (see [`crate::RegistrationService`]); the store
//! only allocates ids, persists records and answers lookups.

use crate::errors::*;
use crate::types::*;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Trait for site registration storage backends.
///
/// Unknown ids are reported as `Ok(None)`; `Err` is reserved for backend faults.
pub trait SiteRegistrationStore: Send + Sync {
    /// Allocate a new id and persist an unverified record.
    fn create(
        &self,
        domain: &str,
        owner_wallet: &str,
        verification_token: &str,
    ) -> Result<SiteRegistration>;

    /// Exact lookup by id.
    fn get(&self, site_id: SiteId) -> Result<Option<SiteRegistration>>;

    /// Case-insensitive lookup by domain. Returns the most recently created
    /// record when several exist for the same domain.
    fn find_by_domain(&self, domain: &str) -> Result<Option<SiteRegistration>>;

    /// Merge `update` into an existing record and return the result.
    fn update(
        &self,
        site_id: SiteId,
        update: &SiteRegistrationUpdate,
    ) -> Result<Option<SiteRegistration>>;

    /// All records, oldest first.
    fn list(&self) -> Result<Vec<SiteRegistration>>;

    /// Count total records.
    fn count(&self) -> Result<u64>;
}

/// In-memory registration store (process lifetime only).
#[derive(Clone)]
pub struct MemorySiteRegistrationStore {
    inner: Arc<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Primary index: id -> record, ordered by id (creation order)
    registrations: RwLock<BTreeMap<SiteId, SiteRegistration>>,
    next_id: AtomicU64,
}

impl MemorySiteRegistrationStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                registrations: RwLock::new(BTreeMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemorySiteRegistrationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemorySiteRegistrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySiteRegistrationStore")
            .field("registrations", &self.inner.registrations.read().len())
            .finish()
    }
}

impl SiteRegistrationStore for MemorySiteRegistrationStore {
    fn create(
        &self,
        domain: &str,
        owner_wallet: &str,
        verification_token: &str,
    ) -> Result<SiteRegistration> {
        let site_id = SiteId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let registration =
            SiteRegistration::new(site_id, domain, owner_wallet, verification_token);

        self.inner
            .registrations
            .write()
            .insert(site_id, registration.clone());

        Ok(registration)
    }

    fn get(&self, site_id: SiteId) -> Result<Option<SiteRegistration>> {
        Ok(self.inner.registrations.read().get(&site_id).cloned())
    }

    fn find_by_domain(&self, domain: &str) -> Result<Option<SiteRegistration>> {
        let normalized = domain.trim().to_ascii_lowercase();
        let registrations = self.inner.registrations.read();
        Ok(registrations
            .values()
            .rev()
            .find(|reg| reg.domain == normalized)
            .cloned())
    }

    fn update(
        &self,
        site_id: SiteId,
        update: &SiteRegistrationUpdate,
    ) -> Result<Option<SiteRegistration>> {
        let mut registrations = self.inner.registrations.write();
        Ok(registrations.get_mut(&site_id).map(|reg| {
            reg.apply(update);
            reg.clone()
        }))
    }

    fn list(&self) -> Result<Vec<SiteRegistration>> {
        Ok(self.inner.registrations.read().values().cloned().collect())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.inner.registrations.read().len() as u64)
    }
}
