//! Error types for domain verification

use scrapesafe_site_registry::{RegistryError, SiteId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("method must be one of: dns, metaTag, file (got {method:?})")]
    InvalidMethod { method: String },

    #[error("Registration not found: {site_id}")]
    SiteNotFound { site_id: SiteId },

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid match pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, VerificationError>;
