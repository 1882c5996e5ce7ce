//! Follow-on IP asset registration for verified sites

use async_trait::async_trait;
use scrapesafe_site_registry::SiteRegistration;
use serde::{Deserialize, Serialize};

/// Identifier handed back once a verified site has been registered as an IP
/// asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAssetReceipt {
    pub ip_id: String,
    /// True when no on-chain registration took place
    pub simulated: bool,
}

/// Registers a verified site with the IP registry.
#[async_trait]
pub trait IpAssetRegistrar: Send + Sync {
    async fn register_site(&self, registration: &SiteRegistration) -> anyhow::Result<IpAssetReceipt>;
}

/// Registrar that issues local identifiers (`story:local:<siteId>`) without
/// contacting any chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedIpRegistrar;

pub const SIMULATED_IP_PREFIX: &str = "story:local:";

#[async_trait]
impl IpAssetRegistrar for SimulatedIpRegistrar {
    async fn register_site(&self, registration: &SiteRegistration) -> anyhow::Result<IpAssetReceipt> {
        Ok(IpAssetReceipt {
            ip_id: format!("{SIMULATED_IP_PREFIX}{}", registration.site_id),
            simulated: true,
        })
    }
}
