//! Shared contract for ownership checks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bound on any single network check.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent with HTTP checks.
pub const DEFAULT_USER_AGENT: &str = "ScrapeSafe-Verification/1.0";

/// Pass/fail result of a single check.
///
/// `detail` is always populated: on success it names what matched, on failure
/// what was searched and what was (not) found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub success: bool,
    pub detail: String,
}

impl VerificationOutcome {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
        }
    }
}

/// One ownership-proof mechanism.
///
/// Implementations never mutate registration state and never fail: resolver,
/// transport and parse errors are reported as failed outcomes.
#[async_trait]
pub trait OwnershipCheck: Send + Sync {
    async fn check(&self, domain: &str, expected_token: &str) -> VerificationOutcome;
}

/// Network settings shared by the checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CHECK_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
