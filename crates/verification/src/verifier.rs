//! Verification orchestrator
//!
//! A registration moves from unverified to verified on the first successful
//! check and never moves back. Failed checks leave the store untouched, so a
//! claimant can retry as often as needed and switch methods between attempts.

use crate::dns::{DnsTxtCheck, HickoryTxtResolver};
use crate::errors::*;
use crate::http::build_client;
use crate::meta_tag::MetaTagCheck;
use crate::method::VerificationMethod;
use crate::strategy::{OwnershipCheck, VerificationConfig, VerificationOutcome};
use crate::well_known::WellKnownFileCheck;
use metrics::counter;
use scrapesafe_site_registry::{
    SiteId, SiteRegistration, SiteRegistrationStore, SiteRegistrationUpdate,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Counter of verification attempts, labelled by `method` and `outcome`.
pub const VERIFICATION_ATTEMPTS_METRIC: &str = "scrapesafe_verification_attempts_total";

/// One check per verification method.
#[derive(Clone)]
pub struct StrategySet {
    dns: Arc<dyn OwnershipCheck>,
    meta_tag: Arc<dyn OwnershipCheck>,
    file: Arc<dyn OwnershipCheck>,
}

impl StrategySet {
    pub fn new(
        dns: Arc<dyn OwnershipCheck>,
        meta_tag: Arc<dyn OwnershipCheck>,
        file: Arc<dyn OwnershipCheck>,
    ) -> Self {
        Self {
            dns,
            meta_tag,
            file,
        }
    }

    /// Production checks: system DNS resolver and a shared HTTP client.
    pub fn from_config(config: &VerificationConfig) -> Result<Self> {
        let resolver = Arc::new(HickoryTxtResolver::from_system_conf(config.timeout));
        let client = build_client(config)?;

        Ok(Self::new(
            Arc::new(DnsTxtCheck::with_timeout(resolver, config.timeout)),
            Arc::new(MetaTagCheck::with_client(client.clone())?),
            Arc::new(WellKnownFileCheck::with_client(client)),
        ))
    }

    pub fn get(&self, method: VerificationMethod) -> &Arc<dyn OwnershipCheck> {
        match method {
            VerificationMethod::Dns => &self.dns,
            VerificationMethod::MetaTag => &self.meta_tag,
            VerificationMethod::File => &self.file,
        }
    }
}

impl std::fmt::Debug for StrategySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategySet").finish_non_exhaustive()
    }
}

/// Result of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Registration state after the attempt
    pub registration: SiteRegistration,
    pub method: VerificationMethod,
    pub outcome: VerificationOutcome,
}

impl VerificationReport {
    pub fn is_verified(&self) -> bool {
        self.outcome.success
    }
}

pub struct SiteVerifier {
    store: Arc<dyn SiteRegistrationStore>,
    strategies: StrategySet,
}

impl SiteVerifier {
    pub fn new(store: Arc<dyn SiteRegistrationStore>, strategies: StrategySet) -> Self {
        Self { store, strategies }
    }

    /// Parse `method` and verify. An unknown method is rejected before the
    /// store or the network is touched.
    pub async fn verify_request(&self, site_id: SiteId, method: &str) -> Result<VerificationReport> {
        let method: VerificationMethod = method.parse()?;
        self.verify(site_id, method).await
    }

    /// Run one check for `site_id` and mark the registration verified if it
    /// passes. Already-verified registrations are checked again; a failure
    /// does not revert them.
    pub async fn verify(
        &self,
        site_id: SiteId,
        method: VerificationMethod,
    ) -> Result<VerificationReport> {
        let registration = self
            .store
            .get(site_id)?
            .ok_or(VerificationError::SiteNotFound { site_id })?;

        debug!(
            "Verifying site {} ({}) via {}",
            site_id, registration.domain, method
        );

        let outcome = self
            .strategies
            .get(method)
            .check(&registration.domain, &registration.verification_token)
            .await;

        let outcome_label = if outcome.success { "success" } else { "failure" };
        counter!(
            VERIFICATION_ATTEMPTS_METRIC,
            "method" => method.as_str(),
            "outcome" => outcome_label
        )
        .increment(1);

        let registration = if outcome.success {
            let updated = self
                .store
                .update(site_id, &SiteRegistrationUpdate::mark_verified())?
                .ok_or(VerificationError::SiteNotFound { site_id })?;
            info!(
                site_id = %site_id,
                domain = %updated.domain,
                method = %method,
                "Domain ownership verified"
            );
            updated
        } else {
            info!(
                site_id = %site_id,
                domain = %registration.domain,
                method = %method,
                detail = %outcome.detail,
                "Domain ownership check failed"
            );
            registration
        };

        Ok(VerificationReport {
            registration,
            method,
            outcome,
        })
    }
}

impl std::fmt::Debug for SiteVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteVerifier").finish_non_exhaustive()
    }
}
