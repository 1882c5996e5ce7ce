//! Types for the site registry

use crate::errors::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest hostname accepted for a registration.
pub const MAX_DOMAIN_LEN: usize = 253;

/// Longest single DNS label.
pub const MAX_LABEL_LEN: usize = 63;

/// Numeric registration identifier, assigned in increasing order starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(pub u64);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pending or verified claim that a wallet controls a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRegistration {
    /// Primary key, never reused
    pub site_id: SiteId,
    /// Lower-cased hostname
    pub domain: String,
    /// Lower-cased `0x` address of the claimant
    pub owner_wallet: String,
    /// Secret the claimant publishes to prove control of the domain
    pub verification_token: String,
    /// Flips to true once, on the first successful check
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl SiteRegistration {
    /// Build a fresh, unverified record. Domain and wallet are lower-cased.
    pub fn new(
        site_id: SiteId,
        domain: &str,
        owner_wallet: &str,
        verification_token: impl Into<String>,
    ) -> Self {
        Self {
            site_id,
            domain: domain.trim().to_ascii_lowercase(),
            owner_wallet: owner_wallet.trim().to_ascii_lowercase(),
            verification_token: verification_token.into(),
            verified: false,
            created_at: Utc::now(),
        }
    }

    /// Merge a partial update into this record.
    ///
    /// `verified` only ever moves from false to true.
    pub fn apply(&mut self, update: &SiteRegistrationUpdate) {
        if let Some(verified) = update.verified {
            self.verified = self.verified || verified;
        }
    }
}

/// Partial update applied through [`crate::SiteRegistrationStore::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRegistrationUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
}

impl SiteRegistrationUpdate {
    pub fn mark_verified() -> Self {
        Self {
            verified: Some(true),
        }
    }
}

/// Which hostnames the registration service accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainPolicy {
    /// Also accept `localhost` and `localhost:<port>` (local development only)
    pub allow_localhost: bool,
}

impl DomainPolicy {
    pub fn development() -> Self {
        Self {
            allow_localhost: true,
        }
    }
}

/// Validate and normalise a domain supplied by a caller.
///
/// Accepts dot-separated labels of ASCII letters, digits and hyphens, each
/// 1-63 characters without a leading or trailing hyphen, at least two labels,
/// and an alphabetic final label of two or more characters.
pub fn normalize_domain(raw: &str, policy: DomainPolicy) -> Result<String> {
    let domain = raw.trim().to_ascii_lowercase();
    if domain.is_empty() {
        return Err(RegistryError::MissingDomain);
    }

    if policy.allow_localhost && is_localhost(&domain) {
        return Ok(domain);
    }

    if is_valid_hostname(&domain) {
        Ok(domain)
    } else {
        Err(RegistryError::InvalidDomain {
            domain: raw.trim().to_string(),
        })
    }
}

/// Validate and normalise an owner wallet (`0x` followed by 40 hex characters).
pub fn normalize_wallet(raw: &str) -> Result<String> {
    let wallet = raw.trim();
    if wallet.is_empty() {
        return Err(RegistryError::MissingWallet);
    }

    let valid = wallet.len() == 42
        && wallet.starts_with("0x")
        && wallet[2..].chars().all(|c| c.is_ascii_hexdigit());

    if valid {
        Ok(wallet.to_ascii_lowercase())
    } else {
        Err(RegistryError::InvalidWallet {
            wallet: wallet.to_string(),
        })
    }
}

fn is_valid_hostname(domain: &str) -> bool {
    if domain.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld_ok = labels
        .last()
        .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);

    labels_ok && tld_ok
}

fn is_localhost(domain: &str) -> bool {
    match domain.split_once(':') {
        None => domain == "localhost",
        Some((host, port)) => host == "localhost" && port.parse::<u16>().map_or(false, |p| p > 0),
    }
}
