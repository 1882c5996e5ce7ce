//! Service configuration: optional TOML file, then `SCRAPESAFE_*`
//! environment variables, then command line overrides.

use anyhow::{Context, Result};
use config::{Config, File as ConfigFile};
use scrapesafe_site_registry::DomainPolicy;
use scrapesafe_verification::VerificationConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SCRAPESAFE";
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

const DEFAULT_VERIFICATION_TIMEOUT_MS: u64 = 10_000;
const MAX_VERIFICATION_TIMEOUT_MS: u64 = 120_000;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub config_path: Option<PathBuf>,
    pub node_id: String,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub allowed_origins: Vec<String>,
    pub verification_timeout_ms: u64,
    pub user_agent: String,
    pub log_level: String,
    pub log_format: String,
    pub prometheus_enabled: bool,
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let verification = VerificationConfig::default();
        Self {
            config_path: None,
            node_id: "scrapesafe-local".to_string(),
            rpc_host: "127.0.0.1".to_string(),
            rpc_port: 8080,
            allowed_origins: Vec::new(),
            verification_timeout_ms: DEFAULT_VERIFICATION_TIMEOUT_MS,
            user_agent: verification.user_agent,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            prometheus_enabled: true,
            dev_mode: false,
        }
    }
}

impl AppConfig {
    /// Load from `config_path_override`, or from [`DEFAULT_CONFIG_PATH`] when
    /// it exists, layered under the environment.
    pub fn load(config_path_override: Option<&str>) -> Result<Self> {
        let resolved_path = match config_path_override {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    anyhow::bail!(
                        "Configuration file {} not found (specified via --config)",
                        path.display()
                    );
                }
                Some(path)
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                path.exists().then_some(path)
            }
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX));

        let config = builder
            .build()
            .context("failed to assemble configuration sources")?;

        Self::from_source(&config, resolved_path)
    }

    fn from_source(config: &Config, config_path: Option<PathBuf>) -> Result<Self> {
        let defaults = Self::default();

        let rpc_port = match get_u64_value(config, &["rpc_port", "rpc.port"])? {
            Some(port) => u16::try_from(port)
                .with_context(|| format!("RPC_PORT {port} is out of range"))?,
            None => defaults.rpc_port,
        };

        let allowed_origins = get_string_value(
            config,
            &["rpc_allowed_origins", "allowed_origins", "rpc.allowed_origins"],
        )
        .map(|value| split_list(&value))
        .unwrap_or(defaults.allowed_origins);

        Ok(Self {
            config_path,
            node_id: get_string_value(config, &["node_id", "node.id"]).unwrap_or(defaults.node_id),
            rpc_host: get_string_value(config, &["rpc_host", "rpc.host"])
                .unwrap_or(defaults.rpc_host),
            rpc_port,
            allowed_origins,
            verification_timeout_ms: get_u64_value(
                config,
                &["verification_timeout_ms", "verification.timeout_ms"],
            )?
            .unwrap_or(defaults.verification_timeout_ms),
            user_agent: get_string_value(config, &["user_agent", "verification.user_agent"])
                .unwrap_or(defaults.user_agent),
            log_level: get_string_value(config, &["log_level", "logging.level"])
                .unwrap_or(defaults.log_level),
            log_format: get_string_value(config, &["log_format", "logging.format"])
                .unwrap_or(defaults.log_format),
            prometheus_enabled: get_bool_value(
                config,
                &["prometheus_enabled", "metrics.enabled"],
                defaults.prometheus_enabled,
            ),
            dev_mode: get_bool_value(config, &["dev_mode", "node.dev_mode"], defaults.dev_mode),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_id.trim().is_empty() {
            anyhow::bail!("NODE_ID must not be empty");
        }
        if self.rpc_host.trim().is_empty() {
            anyhow::bail!("RPC_HOST must not be empty");
        }
        if self.rpc_port == 0 {
            anyhow::bail!("RPC_PORT must be greater than zero");
        }
        if self.verification_timeout_ms == 0
            || self.verification_timeout_ms > MAX_VERIFICATION_TIMEOUT_MS
        {
            anyhow::bail!(
                "VERIFICATION_TIMEOUT_MS must be between 1 and {MAX_VERIFICATION_TIMEOUT_MS}"
            );
        }
        if self.user_agent.trim().is_empty() {
            anyhow::bail!("USER_AGENT must not be empty");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!(
                "LOG_FORMAT must be 'pretty' or 'json' (got '{}')",
                self.log_format
            );
        }
        Ok(())
    }

    pub fn rpc_addr(&self) -> String {
        format!("{}:{}", self.rpc_host, self.rpc_port)
    }

    pub fn verification(&self) -> VerificationConfig {
        VerificationConfig {
            timeout: Duration::from_millis(self.verification_timeout_ms),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Localhost registrations are only accepted in development mode.
    pub fn domain_policy(&self) -> DomainPolicy {
        if self.dev_mode {
            DomainPolicy::development()
        } else {
            DomainPolicy::default()
        }
    }

    pub fn config_path_display(&self) -> String {
        self.config_path
            .as_deref()
            .map(Path::display)
            .map(|path| path.to_string())
            .unwrap_or_else(|| "(built-in defaults)".to_string())
    }
}

fn get_string_value(config: &Config, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        config
            .get_string(key)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn get_u64_value(config: &Config, keys: &[&str]) -> Result<Option<u64>> {
    match get_string_value(config, keys) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("expected a non-negative integer for {}, got '{raw}'", keys[0])),
        None => Ok(None),
    }
}

fn get_bool_value(config: &Config, keys: &[&str], default: bool) -> bool {
    for key in keys {
        if let Ok(value) = config.get_bool(key) {
            return value;
        }
        if let Ok(raw) = config.get_string(key) {
            if let Ok(parsed) = raw.parse::<bool>() {
                return parsed;
            }
        }
    }
    default
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
