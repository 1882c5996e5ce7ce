//! DNS TXT record check

use crate::strategy::{OwnershipCheck, VerificationOutcome, DEFAULT_CHECK_TIMEOUT};
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::TokioAsyncResolver;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Label prepended to the domain for the verification record.
pub const DNS_RECORD_PREFIX: &str = "_scrapesafe";

/// Host queried for a domain's verification record.
pub fn txt_host(domain: &str) -> String {
    format!("{DNS_RECORD_PREFIX}.{domain}")
}

/// Answer to a TXT query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxtLookup {
    /// Character-strings of every returned record, in answer order
    Found(Vec<String>),
    /// The name or the TXT data does not exist
    NotFound,
}

/// Resolver faults other than "no such record".
#[derive(Debug, Clone, Error)]
pub enum DnsLookupError {
    #[error("resolver error for {host}: {message}")]
    Resolver { host: String, message: String },
}

#[async_trait]
pub trait TxtResolver: Send + Sync {
    async fn lookup_txt(&self, host: &str) -> Result<TxtLookup, DnsLookupError>;
}

/// TXT resolver backed by hickory-dns.
#[derive(Clone)]
pub struct HickoryTxtResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryTxtResolver {
    /// Use the host's resolver configuration, falling back to hickory's
    /// default upstreams when it cannot be read.
    pub fn from_system_conf(timeout: Duration) -> Self {
        match hickory_resolver::system_conf::read_system_conf() {
            Ok((config, opts)) => Self::with_config(config, opts, timeout),
            Err(err) => {
                warn!(
                    "Failed to read system resolver configuration ({}); using default upstreams",
                    err
                );
                Self::with_config(ResolverConfig::default(), ResolverOpts::default(), timeout)
            }
        }
    }

    pub fn with_config(config: ResolverConfig, mut opts: ResolverOpts, timeout: Duration) -> Self {
        opts.timeout = timeout;
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

#[async_trait]
impl TxtResolver for HickoryTxtResolver {
    async fn lookup_txt(&self, host: &str) -> Result<TxtLookup, DnsLookupError> {
        match self.resolver.txt_lookup(host).await {
            Ok(lookup) => {
                let strings: Vec<String> = lookup
                    .iter()
                    .flat_map(|txt| {
                        txt.txt_data()
                            .iter()
                            .map(|data| String::from_utf8_lossy(data).into_owned())
                    })
                    .collect();

                if strings.is_empty() {
                    Ok(TxtLookup::NotFound)
                } else {
                    Ok(TxtLookup::Found(strings))
                }
            }
            Err(err) => classify_resolve_error(host, &err),
        }
    }
}

/// Only NXDOMAIN and empty NOERROR answers mean the record is absent.
/// SERVFAIL, REFUSED and every other fault are reported as resolver errors.
fn classify_resolve_error(host: &str, err: &ResolveError) -> Result<TxtLookup, DnsLookupError> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NXDomain | ResponseCode::NoError,
            ..
        } => Ok(TxtLookup::NotFound),
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Err(DnsLookupError::Resolver {
            host: host.to_string(),
            message: format!("{err} ({response_code})"),
        }),
        _ => Err(DnsLookupError::Resolver {
            host: host.to_string(),
            message: err.to_string(),
        }),
    }
}

impl std::fmt::Debug for HickoryTxtResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryTxtResolver").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum StaticAnswer {
    Records(Vec<String>),
    Failure(String),
}

/// Resolver that answers from preconfigured records. No DNS queries are made.
#[derive(Debug, Clone, Default)]
pub struct StaticTxtResolver {
    answers: Arc<RwLock<HashMap<String, StaticAnswer>>>,
}

impl StaticTxtResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `host` with the given character-strings.
    pub fn insert_record<I, S>(&self, host: &str, strings: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answers.write().insert(
            host.to_ascii_lowercase(),
            StaticAnswer::Records(strings.into_iter().map(Into::into).collect()),
        );
    }

    /// Make lookups of `host` fail with a resolver error.
    pub fn insert_failure(&self, host: &str, message: impl Into<String>) {
        self.answers
            .write()
            .insert(host.to_ascii_lowercase(), StaticAnswer::Failure(message.into()));
    }
}

#[async_trait]
impl TxtResolver for StaticTxtResolver {
    async fn lookup_txt(&self, host: &str) -> Result<TxtLookup, DnsLookupError> {
        match self.answers.read().get(&host.to_ascii_lowercase()) {
            Some(StaticAnswer::Records(strings)) if !strings.is_empty() => {
                Ok(TxtLookup::Found(strings.clone()))
            }
            Some(StaticAnswer::Records(_)) | None => Ok(TxtLookup::NotFound),
            Some(StaticAnswer::Failure(message)) => Err(DnsLookupError::Resolver {
                host: host.to_string(),
                message: message.clone(),
            }),
        }
    }
}

/// Checks for the token in the TXT record at `_scrapesafe.<domain>`.
pub struct DnsTxtCheck {
    resolver: Arc<dyn TxtResolver>,
    timeout: Duration,
}

impl DnsTxtCheck {
    pub fn new(resolver: Arc<dyn TxtResolver>) -> Self {
        Self::with_timeout(resolver, DEFAULT_CHECK_TIMEOUT)
    }

    pub fn with_timeout(resolver: Arc<dyn TxtResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }
}

#[async_trait]
impl OwnershipCheck for DnsTxtCheck {
    async fn check(&self, domain: &str, expected_token: &str) -> VerificationOutcome {
        let host = txt_host(domain);
        debug!("Resolving TXT records at {}", host);

        let lookup =
            match tokio::time::timeout(self.timeout, self.resolver.lookup_txt(&host)).await {
                Ok(Ok(lookup)) => lookup,
                Ok(Err(err)) => {
                    warn!("TXT lookup for {} failed: {}", host, err);
                    return VerificationOutcome::failure(format!(
                        "Failed to verify DNS TXT record: {err}"
                    ));
                }
                Err(_) => {
                    return VerificationOutcome::failure(format!(
                        "DNS lookup for {host} timed out after {} ms",
                        self.timeout.as_millis()
                    ));
                }
            };

        let expected = expected_token.trim();
        match lookup {
            TxtLookup::NotFound => VerificationOutcome::failure(format!(
                "No TXT record found at {host}. Please ensure the DNS record is added and propagated."
            )),
            TxtLookup::Found(strings) => {
                let raw = strings.concat();
                if txt_value_matches(&raw, expected) {
                    VerificationOutcome::success(format!(
                        "Found valid token in TXT record at {host}"
                    ))
                } else {
                    let found = if raw.is_empty() { "no records" } else { raw.as_str() };
                    VerificationOutcome::failure(format!(
                        "Token not found in TXT record at {host}. Found: {found}, Expected: {expected}"
                    ))
                }
            }
        }
    }
}

/// Quotes and surrounding whitespace are stripped from the concatenated
/// record. The token may appear anywhere in the result.
pub fn txt_value_matches(raw: &str, expected_token: &str) -> bool {
    let expected = expected_token.trim();
    if expected.is_empty() {
        return false;
    }
    let normalized = raw.replace('"', "");
    let normalized = normalized.trim();
    normalized == expected || normalized.contains(expected)
}
