//! Registration service
//!
//! Applies the registration policy on top of a [`SiteRegistrationStore`]:
//! input validation, one unverified claim per domain, and token issuing.

use crate::errors::*;
use crate::registry::SiteRegistrationStore;
use crate::token::{TokenIssuer, UuidTokenIssuer};
use crate::types::*;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a registration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub registration: SiteRegistration,
    /// False when an existing unverified claim was returned instead
    pub created: bool,
}

/// Registration entry point shared by the API layer.
pub struct RegistrationService {
    store: Arc<dyn SiteRegistrationStore>,
    issuer: Arc<dyn TokenIssuer>,
    policy: DomainPolicy,
    /// Serialises find-then-create so a domain never gets two unverified records
    register_lock: Mutex<()>,
}

impl RegistrationService {
    pub fn new(store: Arc<dyn SiteRegistrationStore>, policy: DomainPolicy) -> Self {
        Self::with_issuer(store, Arc::new(UuidTokenIssuer), policy)
    }

    pub fn with_issuer(
        store: Arc<dyn SiteRegistrationStore>,
        issuer: Arc<dyn TokenIssuer>,
        policy: DomainPolicy,
    ) -> Self {
        Self {
            store,
            issuer,
            policy,
            register_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SiteRegistrationStore> {
        &self.store
    }

    /// Register `domain` for `owner_wallet`.
    ///
    /// Re-registering a domain that still has an unverified record returns that
    /// record (same id, same token) so already-published DNS records, tags and
    /// files stay valid. A verified domain gets a fresh record.
    pub fn register(&self, domain: &str, owner_wallet: &str) -> Result<Registered> {
        let domain = normalize_domain(domain, self.policy)?;
        let owner_wallet = normalize_wallet(owner_wallet)?;

        let _guard = self.register_lock.lock();

        if let Some(existing) = self.store.find_by_domain(&domain)? {
            if !existing.verified {
                debug!(
                    "Returning pending registration {} for {}",
                    existing.site_id, domain
                );
                return Ok(Registered {
                    registration: existing,
                    created: false,
                });
            }
        }

        let token = self.issuer.issue();
        let registration = self.store.create(&domain, &owner_wallet, &token)?;
        info!(
            site_id = %registration.site_id,
            domain = %registration.domain,
            "Created site registration"
        );

        Ok(Registered {
            registration,
            created: true,
        })
    }

    /// Fetch the current state of a registration.
    pub fn lookup(&self, site_id: SiteId) -> Result<Option<SiteRegistration>> {
        self.store.get(site_id)
    }

    /// All registrations, oldest first.
    pub fn list(&self) -> Result<Vec<SiteRegistration>> {
        self.store.list()
    }
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
