//! Verification token issuing

use uuid::Uuid;

/// Namespace prefix that makes tokens recognisable in DNS records and markup.
pub const TOKEN_PREFIX: &str = "scrapesafe-";

/// Source of unguessable verification tokens.
pub trait TokenIssuer: Send + Sync {
    /// Produce a token that no other registration has received.
    fn issue(&self) -> String;
}

/// Issues `scrapesafe-<uuid v4>` tokens (122 random bits).
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenIssuer;

impl TokenIssuer for UuidTokenIssuer {
    fn issue(&self) -> String {
        format!("{TOKEN_PREFIX}{}", Uuid::new_v4())
    }
}
