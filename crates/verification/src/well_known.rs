//! `/.well-known/scrapesafe.json` check

use crate::errors::*;
use crate::http::{build_client, fetch_text, site_url};
use crate::strategy::{OwnershipCheck, VerificationConfig, VerificationOutcome};
use async_trait::async_trait;
use serde_json::Value;

pub const WELL_KNOWN_PATH: &str = "/.well-known/scrapesafe.json";

/// Key of the token in the well-known file.
pub const VERIFICATION_FIELD: &str = "verification";

pub struct WellKnownFileCheck {
    client: reqwest::Client,
}

impl WellKnownFileCheck {
    pub fn new(config: &VerificationConfig) -> Result<Self> {
        Ok(Self::with_client(build_client(config)?))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OwnershipCheck for WellKnownFileCheck {
    async fn check(&self, domain: &str, expected_token: &str) -> VerificationOutcome {
        let url = site_url(domain, WELL_KNOWN_PATH);
        let body = match fetch_text(&self.client, &url).await {
            Ok(body) => body,
            Err(err) => return VerificationOutcome::failure(format!("Failed to verify file: {err}")),
        };

        let document: Value = match serde_json::from_str(&body) {
            Ok(document) => document,
            Err(err) => {
                return VerificationOutcome::failure(format!(
                    "Failed to verify file: invalid JSON in {WELL_KNOWN_PATH}: {err}"
                ))
            }
        };

        let expected = expected_token.trim();
        let published = document
            .get(VERIFICATION_FIELD)
            .and_then(Value::as_str);

        match published {
            Some(token) if !expected.is_empty() && token == expected => {
                VerificationOutcome::success(format!(
                    "Found valid verification file at {WELL_KNOWN_PATH}"
                ))
            }
            _ => VerificationOutcome::failure(format!(
                "Token mismatch in verification file. Expected: {expected}"
            )),
        }
    }
}
