//! Site registration and verification endpoints under `/api/owner`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scrapesafe_site_registry::{RegistryError, SiteId, SiteRegistration};
use scrapesafe_verification::{VerificationError, VerificationInstructions, VerificationMethod};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::server::{ApiError, SharedState};

pub const SITE_NOT_FOUND: &str = "Registration not found";
pub const REGISTER_FIRST: &str = "Registration not found. Please register the domain first.";
pub const INVALID_METHOD: &str = "method must be one of: dns, metaTag, file";

/// Body of `POST /api/owner/register`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSiteRequest {
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub owner_wallet: Option<String>,
}

/// Registration plus how to prove ownership.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterSiteResponse {
    #[serde(flatten)]
    pub registration: SiteRegistration,
    pub verification_methods: VerificationInstructions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteLookupQuery {
    #[serde(default)]
    pub site_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SiteListResponse {
    pub sites: Vec<SiteRegistration>,
    pub total: u64,
}

/// Body of `POST /api/owner/verify`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySiteRequest {
    #[serde(default)]
    pub site_id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySiteSuccess {
    pub ok: bool,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub story_ip_id: Option<String>,
    pub story_simulated: bool,
}

#[derive(Debug, Serialize)]
pub struct VerifySiteFailure {
    pub ok: bool,
    pub error: String,
}

fn registry_error(err: RegistryError) -> ApiError {
    if err.is_validation() {
        ApiError::bad_request(err.to_string())
    } else {
        warn!("Registry failure: {}", err);
        ApiError::internal("Internal registry error")
    }
}

/// POST /api/owner/register
pub async fn handle_register_site(
    State(state): State<SharedState>,
    payload: Result<Json<RegisterSiteRequest>, JsonRejection>,
) -> Result<Json<RegisterSiteResponse>, ApiError> {
    state.record_request();
    let Json(request) = payload?;

    let domain = request.domain.unwrap_or_default();
    let owner_wallet = request.owner_wallet.unwrap_or_default();

    let registered = state
        .registration
        .register(&domain, &owner_wallet)
        .map_err(registry_error)?;

    let registration = registered.registration;
    debug!(
        "Registration {} for {} (created: {})",
        registration.site_id, registration.domain, registered.created
    );

    let verification_methods = VerificationInstructions::for_registration(
        &registration.domain,
        &registration.verification_token,
    );

    Ok(Json(RegisterSiteResponse {
        registration,
        verification_methods,
    }))
}

/// GET /api/owner/register?siteId=N
pub async fn handle_lookup_site(
    State(state): State<SharedState>,
    query: Result<Query<SiteLookupQuery>, QueryRejection>,
) -> Result<Json<SiteRegistration>, ApiError> {
    state.record_request();
    let Query(query) =
        query.map_err(|err| ApiError::bad_request(format!("Invalid query: {}", err.body_text())))?;

    let site_id = parse_site_id(query.site_id.as_deref())?;
    let registration = state
        .registration
        .lookup(site_id)
        .map_err(registry_error)?
        .ok_or_else(|| ApiError::not_found(SITE_NOT_FOUND))?;

    Ok(Json(registration))
}

/// GET /api/owner/sites
pub async fn handle_list_sites(
    State(state): State<SharedState>,
) -> Result<Json<SiteListResponse>, ApiError> {
    state.record_request();
    let sites = state.registration.list().map_err(registry_error)?;
    let total = sites.len() as u64;
    Ok(Json(SiteListResponse { sites, total }))
}

/// POST /api/owner/verify
///
/// A check that ran but did not pass is answered with 400 and
/// `{"ok": false, "error": <detail>}`; input and lookup problems use the
/// plain `{"error": ...}` shape.
pub async fn handle_verify_site(
    State(state): State<SharedState>,
    payload: Result<Json<VerifySiteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    state.record_request();
    let Json(request) = payload?;

    let site_id = require_site_id(request.site_id)?;
    let method = request
        .method
        .as_deref()
        .unwrap_or(VerificationMethod::default().as_str());

    let report = state
        .verifier
        .verify_request(site_id, method)
        .await
        .map_err(|err| match err {
            VerificationError::InvalidMethod { .. } => ApiError::bad_request(INVALID_METHOD),
            VerificationError::SiteNotFound { .. } => ApiError::not_found(REGISTER_FIRST),
            other => {
                warn!("Verification of site {} failed: {}", site_id, other);
                ApiError::internal("Internal verification error")
            }
        })?;

    if !report.is_verified() {
        let failure = VerifySiteFailure {
            ok: false,
            error: report.outcome.detail,
        };
        return Ok((StatusCode::BAD_REQUEST, Json(failure)).into_response());
    }

    let (story_ip_id, story_simulated) =
        match state.ip_registrar.register_site(&report.registration).await {
            Ok(receipt) => (Some(receipt.ip_id), receipt.simulated),
            Err(err) => {
                warn!(
                    "IP asset registration for site {} failed: {:#}",
                    site_id, err
                );
                (None, false)
            }
        };

    Ok(Json(VerifySiteSuccess {
        ok: true,
        details: report.outcome.detail,
        story_ip_id,
        story_simulated,
    })
    .into_response())
}

fn parse_site_id(raw: Option<&str>) -> Result<SiteId, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::bad_request("siteId is required"))?;

    let id = raw
        .parse::<u64>()
        .map_err(|_| ApiError::bad_request(format!("Invalid siteId: {raw}")))?;
    require_site_id(Some(id))
}

/// Ids are assigned from 1, so 0 counts as absent.
fn require_site_id(id: Option<u64>) -> Result<SiteId, ApiError> {
    id.filter(|id| *id != 0)
        .map(SiteId)
        .ok_or_else(|| ApiError::bad_request("siteId is required"))
}
