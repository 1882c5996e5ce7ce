use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use scrapesafe_site_registry::RegistrationService;
use scrapesafe_verification::SiteVerifier;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::ip_asset::IpAssetRegistrar;
use crate::sites::{
    handle_list_sites, handle_lookup_site, handle_register_site, handle_verify_site,
};

/// Largest request body accepted by the API.
const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<RegistrationService>,
    pub verifier: Arc<SiteVerifier>,
    pub ip_registrar: Arc<dyn IpAssetRegistrar>,
    pub node_id: String,
    pub start_time: Instant,
    pub req_count: Arc<AtomicUsize>,
    pub metrics: Option<PrometheusHandle>,
    /// `*` allows any origin; empty disables the CORS layer
    pub allowed_origins: Vec<String>,
    pub dev_mode: bool,
}

impl AppState {
    pub(crate) fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn registration_count(&self) -> Option<u64> {
        self.registration.store().count().ok()
    }
}

pub(crate) type SharedState = Arc<AppState>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    node_id: String,
    uptime_secs: u64,
    registrations: Option<u64>,
    dev_mode: bool,
    req_total: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionResponse {
    node_id: String,
    version: &'static str,
    git_commit: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Error reply rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, payload).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let shared = Arc::new(state);
    let app = build_router(shared);
    let listener = bind_listener(addr).await?;
    info!("ScrapeSafe API listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("RPC server terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind RPC listener on {addr}"))
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping API server");
}

pub fn build_router(state: SharedState) -> Router {
    let cors = build_cors_layer(&state.allowed_origins);

    let router = Router::new()
        .route("/health", get(handle_health))
        .route("/version", get(handle_version))
        .route("/metrics", get(handle_metrics))
        .route(
            "/api/owner/register",
            post(handle_register_site).get(handle_lookup_site),
        )
        .route("/api/owner/sites", get(handle_list_sites))
        .route("/api/owner/verify", post(handle_verify_site))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

fn build_cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    if allowed_origins.iter().any(|origin| origin == "*") {
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

async fn handle_health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let req_total = state.record_request();
    Json(HealthResponse {
        status: "ok",
        node_id: state.node_id.clone(),
        uptime_secs: state.uptime_seconds(),
        registrations: state.registration_count(),
        dev_mode: state.dev_mode,
        req_total,
    })
}

async fn handle_version(State(state): State<SharedState>) -> Json<VersionResponse> {
    state.record_request();
    Json(VersionResponse {
        node_id: state.node_id.clone(),
        version: env!("CARGO_PKG_VERSION"),
        git_commit: option_env!("GIT_COMMIT_HASH"),
    })
}

async fn handle_metrics(State(state): State<SharedState>) -> Response {
    let req_total = state.record_request();
    let uptime = state.uptime_seconds();

    let mut metrics =
        "# HELP scrapesafe_api_requests_total Total number of API requests handled\n".to_string();
    metrics.push_str("# TYPE scrapesafe_api_requests_total counter\n");
    metrics.push_str(&format!("scrapesafe_api_requests_total {req_total}\n"));
    metrics.push_str("# HELP scrapesafe_uptime_seconds Uptime of the service in seconds\n");
    metrics.push_str("# TYPE scrapesafe_uptime_seconds gauge\n");
    metrics.push_str(&format!("scrapesafe_uptime_seconds {uptime}\n"));

    if let Some(registrations) = state.registration_count() {
        metrics.push_str("# HELP scrapesafe_registrations Number of site registrations\n");
        metrics.push_str("# TYPE scrapesafe_registrations gauge\n");
        metrics.push_str(&format!("scrapesafe_registrations {registrations}\n"));
    }

    if let Some(handle) = &state.metrics {
        metrics.push_str(&handle.render());
    }

    let mut response = Response::new(Body::from(metrics));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}
