//! `<meta name="scrapesafe">` check on the site root

use crate::errors::*;
use crate::http::{build_client, fetch_text, site_url};
use crate::strategy::{OwnershipCheck, VerificationConfig, VerificationOutcome};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

/// Value of the `name` attribute that marks the verification tag.
pub const META_TAG_NAME: &str = "scrapesafe";

pub struct MetaTagCheck {
    client: reqwest::Client,
    tag_pattern: Regex,
    attr_pattern: Regex,
}

impl MetaTagCheck {
    pub fn new(config: &VerificationConfig) -> Result<Self> {
        Self::with_client(build_client(config)?)
    }

    pub fn with_client(client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            client,
            tag_pattern: Regex::new(r"(?is)<meta\b[^>]*>")?,
            attr_pattern: Regex::new(r#"(?i)([a-z][a-z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)?,
        })
    }

    /// `content` values of every scrapesafe meta tag in `html`, in document
    /// order. Attribute order and case of the tag name do not matter.
    pub fn extract_tokens(&self, html: &str) -> Vec<String> {
        self.tag_pattern
            .find_iter(html)
            .filter_map(|tag| {
                let mut name = None;
                let mut content = None;
                for caps in self.attr_pattern.captures_iter(tag.as_str()) {
                    let value = caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    match caps[1].to_ascii_lowercase().as_str() {
                        "name" => name = Some(value),
                        "content" => content = Some(value),
                        _ => {}
                    }
                }
                match (name, content) {
                    (Some(name), Some(content))
                        if name.trim().eq_ignore_ascii_case(META_TAG_NAME) =>
                    {
                        Some(content.to_string())
                    }
                    _ => None,
                }
            })
            .collect()
    }
}

#[async_trait]
impl OwnershipCheck for MetaTagCheck {
    async fn check(&self, domain: &str, expected_token: &str) -> VerificationOutcome {
        let url = site_url(domain, "/");
        let html = match fetch_text(&self.client, &url).await {
            Ok(html) => html,
            Err(err) => {
                return VerificationOutcome::failure(format!("Failed to verify meta tag: {err}"))
            }
        };

        let expected = expected_token.trim();
        let found = self.extract_tokens(&html);
        debug!("Found {} scrapesafe meta tag(s) at {}", found.len(), url);

        if !expected.is_empty() && found.iter().any(|token| token == expected) {
            VerificationOutcome::success("Found valid meta tag in HTML head")
        } else {
            VerificationOutcome::failure(format!(
                "Meta tag not found or token mismatch. Expected: {expected}"
            ))
        }
    }
}
