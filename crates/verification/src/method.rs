//! Verification method identifiers

use crate::errors::VerificationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three independent ways a claimant can prove control of a domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationMethod {
    /// TXT record at `_scrapesafe.<domain>`
    #[default]
    #[serde(rename = "dns")]
    Dns,
    /// `<meta name="scrapesafe">` tag on the site root
    #[serde(rename = "metaTag")]
    MetaTag,
    /// `/.well-known/scrapesafe.json`
    #[serde(rename = "file")]
    File,
}

impl VerificationMethod {
    pub const ALL: [VerificationMethod; 3] = [
        VerificationMethod::Dns,
        VerificationMethod::MetaTag,
        VerificationMethod::File,
    ];

    /// Wire name used by the API.
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::Dns => "dns",
            VerificationMethod::MetaTag => "metaTag",
            VerificationMethod::File => "file",
        }
    }
}

impl fmt::Display for VerificationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationMethod {
    type Err = VerificationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        VerificationMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == value)
            .ok_or_else(|| VerificationError::InvalidMethod {
                method: value.to_string(),
            })
    }
}
