//! Error types for the site registry

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid domain format: {domain}")]
    InvalidDomain { domain: String },

    #[error("Domain is required")]
    MissingDomain,

    #[error("Invalid wallet address format: {wallet}")]
    InvalidWallet { wallet: String },

    #[error("ownerWallet is required")]
    MissingWallet,

    #[error("Registry storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl RegistryError {
    /// True when the error was caused by caller input rather than the backend.
    pub fn is_validation(&self) -> bool {
        !matches!(self, RegistryError::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
