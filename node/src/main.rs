use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use scrapesafe_rpc::{start_server, AppState, SimulatedIpRegistrar};
use scrapesafe_site_registry::{MemorySiteRegistrationStore, RegistrationService};
use scrapesafe_verification::verifier::VERIFICATION_ATTEMPTS_METRIC;
use scrapesafe_verification::{SiteVerifier, StrategySet};
use std::net::IpAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod settings;
mod version;

use settings::AppConfig;
use version::{git_commit_hash, SCRAPESAFE_VERSION};

fn build_cli() -> Command {
    Command::new("scrapesafe-node")
        .version(SCRAPESAFE_VERSION)
        .about("ScrapeSafe domain ownership verification service")
        .disable_version_flag(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .global(true),
        )
        .arg(
            Arg::new("dev")
                .long("dev")
                .action(ArgAction::SetTrue)
                .help("Run in development mode (accepts localhost registrations)")
                .global(true),
        )
        .arg(
            Arg::new("version_flag")
                .short('V')
                .long("version")
                .action(ArgAction::SetTrue)
                .help("Print detailed version information and exit")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Override the log level")
                .global(true),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Select log output format")
                .global(true),
        )
        .arg(
            Arg::new("rpc-host")
                .long("rpc-host")
                .value_name("HOST")
                .help("Override API bind host (defaults to config value)")
                .global(true),
        )
        .arg(
            Arg::new("rpc-port")
                .long("rpc-port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Override API port")
                .global(true),
        )
        .arg(
            Arg::new("verification-timeout-ms")
                .long("verification-timeout-ms")
                .value_name("MILLIS")
                .value_parser(value_parser!(u64))
                .help("Override the per-check network timeout")
                .global(true),
        )
        .arg(
            Arg::new("disable-metrics")
                .long("disable-metrics")
                .action(ArgAction::SetTrue)
                .help("Disable the Prometheus metrics recorder")
                .global(true),
        )
        .subcommand(Command::new("start").about("Start the ScrapeSafe API server"))
        .subcommand(
            Command::new("status")
                .about("Check the /health endpoint of a running service")
                .arg(
                    Arg::new("health-path")
                        .long("health-path")
                        .value_name("PATH")
                        .default_value("/health")
                        .help("Health endpoint path to query"),
                ),
        )
}

fn load_config_with_overrides(matches: &ArgMatches) -> Result<AppConfig> {
    let config_path = matches.get_one::<String>("config").map(|value| value.as_str());
    let mut config = AppConfig::load(config_path)?;
    apply_overrides(matches, &mut config);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(matches: &ArgMatches, config: &mut AppConfig) {
    if let Some(log_level) = matches.get_one::<String>("log-level") {
        config.log_level = log_level.clone();
    }

    if let Some(log_format) = matches.get_one::<String>("log-format") {
        config.log_format = log_format.clone();
    }

    if let Some(rpc_host) = matches.get_one::<String>("rpc-host") {
        config.rpc_host = rpc_host.clone();
    }

    if let Some(rpc_port) = matches.get_one::<u16>("rpc-port") {
        config.rpc_port = *rpc_port;
    }

    if let Some(timeout_ms) = matches.get_one::<u64>("verification-timeout-ms") {
        config.verification_timeout_ms = *timeout_ms;
    }

    if matches.get_flag("disable-metrics") {
        config.prometheus_enabled = false;
    }

    if matches.get_flag("dev") {
        config.dev_mode = true;
        config.log_level = "debug".to_string();
        config.log_format = "pretty".to_string();
    }
}

async fn check_status(config: &AppConfig, health_path: &str) -> Result<()> {
    let mut path = health_path.to_string();
    if !path.starts_with('/') {
        path = format!("/{path}");
    }
    let url = format!("http://{}:{}{}", config.rpc_host, config.rpc_port, path);
    let response = reqwest::Client::new().get(&url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    println!("GET {url} -> {status}");
    println!("{body}");
    if status.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Health check failed with status {status}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();

    if let Some(status_matches) = matches.subcommand_matches("status") {
        let config = load_config_with_overrides(status_matches)?;
        let health_path = status_matches
            .get_one::<String>("health-path")
            .map(|value| value.as_str())
            .unwrap_or("/health");
        check_status(&config, health_path).await?;
        return Ok(());
    }

    let start_matches = matches.subcommand_matches("start").unwrap_or(&matches);
    let config = load_config_with_overrides(start_matches)?;

    if start_matches.get_flag("version_flag") {
        print_version_info();
        return Ok(());
    }

    init_logging(&config)?;
    let prometheus_handle = init_metrics(&config);

    info!(
        "Starting ScrapeSafe {} (commit {}) as {}",
        SCRAPESAFE_VERSION,
        git_commit_hash(),
        config.node_id
    );
    info!("Config file: {}", config.config_path_display());
    info!("Development mode: {}", config.dev_mode);
    info!(
        "Verification timeout: {} ms, user agent {:?}",
        config.verification_timeout_ms, config.user_agent
    );

    if !config.dev_mode {
        if let Ok(ip) = config.rpc_host.parse::<IpAddr>() {
            if ip.is_unspecified() {
                warn!(
                    "API host {} binds to all interfaces outside dev mode; consider SCRAPESAFE_RPC_HOST=127.0.0.1 behind a reverse proxy",
                    config.rpc_host
                );
            }
        }
    }

    let store = Arc::new(MemorySiteRegistrationStore::new());
    let registration = Arc::new(RegistrationService::new(
        store.clone(),
        config.domain_policy(),
    ));
    let strategies = StrategySet::from_config(&config.verification())?;
    let verifier = Arc::new(SiteVerifier::new(store, strategies));

    let state = AppState {
        registration,
        verifier,
        ip_registrar: Arc::new(SimulatedIpRegistrar),
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
        req_count: Arc::new(AtomicUsize::new(0)),
        metrics: prometheus_handle,
        allowed_origins: config.allowed_origins.clone(),
        dev_mode: config.dev_mode,
    };

    let rpc_addr = config.rpc_addr();
    info!("Starting API server on {}", rpc_addr);
    start_server(state, &rpc_addr).await?;

    info!("ScrapeSafe stopped");
    Ok(())
}

fn init_metrics(config: &AppConfig) -> Option<PrometheusHandle> {
    if !config.prometheus_enabled {
        info!("Prometheus metrics recorder disabled via configuration");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics recorder registered");
            describe_counter!(
                VERIFICATION_ATTEMPTS_METRIC,
                "Domain ownership verification attempts by method and outcome"
            );
            Some(handle)
        }
        Err(err) => {
            warn!("Failed to install Prometheus metrics recorder: {}", err);
            None
        }
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

fn print_version_info() {
    println!(
        "ScrapeSafe {} (commit {})",
        SCRAPESAFE_VERSION,
        git_commit_hash()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_for(args: &[&str]) -> ArgMatches {
        build_cli().try_get_matches_from(args).unwrap()
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let matches = matches_for(&[
            "scrapesafe-node",
            "--rpc-host",
            "0.0.0.0",
            "--rpc-port",
            "9000",
            "--log-format",
            "json",
            "--verification-timeout-ms",
            "1500",
            "--disable-metrics",
        ]);
        let mut config = AppConfig::default();
        apply_overrides(&matches, &mut config);

        assert_eq!(config.rpc_host, "0.0.0.0");
        assert_eq!(config.rpc_port, 9000);
        assert_eq!(config.log_format, "json");
        assert_eq!(config.verification_timeout_ms, 1500);
        assert!(!config.prometheus_enabled);
        assert!(!config.dev_mode);
    }

    #[test]
    fn dev_flag_enables_localhost_and_debug_logging() {
        let matches = matches_for(&["scrapesafe-node", "start", "--dev"]);
        let start = matches.subcommand_matches("start").unwrap();
        let mut config = AppConfig::default();
        apply_overrides(start, &mut config);

        assert!(config.dev_mode);
        assert_eq!(config.log_level, "debug");
        assert!(config.domain_policy().allow_localhost);
    }

    #[test]
    fn invalid_log_level_is_rejected_by_cli() {
        assert!(build_cli()
            .try_get_matches_from(["scrapesafe-node", "--log-level", "loud"])
            .is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }
}
