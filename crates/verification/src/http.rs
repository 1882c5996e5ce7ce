//! HTTP plumbing shared by the meta tag and well-known file checks

use crate::errors::*;
use crate::strategy::VerificationConfig;
use thiserror::Error;
use tracing::debug;

/// Largest response body the HTTP checks will read.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Why a site fetch produced no usable body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("{0}")]
    Transport(reqwest::Error),

    #[error("Failed to fetch {url}: {status}")]
    Status { url: String, status: String },

    #[error("Failed to read response from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: usize },
}

/// Client used by the HTTP checks. Redirects are followed; the configured
/// timeout bounds each whole request.
pub fn build_client(config: &VerificationConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

/// URL for `path` on `domain`. Local development hosts are fetched over
/// plain HTTP, everything else over HTTPS.
pub fn site_url(domain: &str, path: &str) -> String {
    let scheme = if domain.contains("localhost") {
        "http"
    } else {
        "https"
    };
    format!("{scheme}://{domain}{path}")
}

/// GET `url` and return the body of a 2xx response, read up to
/// [`MAX_BODY_BYTES`].
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> std::result::Result<String, FetchError> {
    fetch_text_limited(client, url, MAX_BODY_BYTES).await
}

pub async fn fetch_text_limited(
    client: &reqwest::Client,
    url: &str,
    limit: usize,
) -> std::result::Result<String, FetchError> {
    debug!("Fetching {}", url);

    let mut response = client.get(url).send().await.map_err(|err| {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport(err)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: format!("{} {}", status.as_u16(), status.canonical_reason().unwrap_or(""))
                .trim_end()
                .to_string(),
        });
    }

    let too_large = || FetchError::TooLarge {
        url: url.to_string(),
        limit,
    };

    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|err| read_error(url, err))? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn read_error(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Body {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
