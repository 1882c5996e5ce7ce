//! Meta tag and well-known file checks against in-process HTTP servers.

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use scrapesafe_verification::http::{
    build_client, fetch_text_limited, site_url, FetchError, MAX_BODY_BYTES,
};
use scrapesafe_verification::{
    MetaTagCheck, OwnershipCheck, VerificationConfig, WellKnownFileCheck,
};
use std::time::Duration;

const TOKEN: &str = "scrapesafe-1f0c7f2e-0000-4000-8000-000000000001";

/// Serve `router` on an ephemeral port and return the `localhost:<port>`
/// domain that reaches it.
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("localhost:{port}")
}

fn html_page(head: &'static str) -> Router {
    Router::new().route(
        "/",
        get(move || async move {
            axum::response::Html(format!("<html><head>{head}</head><body>hi</body></html>"))
        }),
    )
}

fn well_known(body: &'static str) -> Router {
    Router::new().route("/.well-known/scrapesafe.json", get(move || async move { body }))
}

fn short_timeout() -> VerificationConfig {
    VerificationConfig {
        timeout: Duration::from_millis(300),
        ..VerificationConfig::default()
    }
}

#[tokio::test]
async fn meta_tag_with_expected_token_verifies() {
    let domain = serve(html_page(
        r#"<title>x</title><meta name="scrapesafe" content="scrapesafe-1f0c7f2e-0000-4000-8000-000000000001">"#,
    ))
    .await;

    let check = MetaTagCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(outcome.success, "{}", outcome.detail);
    assert_eq!(outcome.detail, "Found valid meta tag in HTML head");
}

#[tokio::test]
async fn meta_tag_missing_fails_with_detail() {
    let domain = serve(html_page("<title>no tag here</title>")).await;

    let check = MetaTagCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert_eq!(
        outcome.detail,
        format!("Meta tag not found or token mismatch. Expected: {TOKEN}")
    );
}

#[tokio::test]
async fn meta_tag_requires_exact_token() {
    let domain = serve(html_page(
        r#"<meta name="scrapesafe" content="prefix-scrapesafe-1f0c7f2e-0000-4000-8000-000000000001">"#,
    ))
    .await;

    let check = MetaTagCheck::new(&VerificationConfig::default()).unwrap();
    assert!(!check.check(&domain, TOKEN).await.success);
}

#[tokio::test]
async fn meta_tag_non_success_status_fails() {
    let domain = serve(Router::new().route(
        "/",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
    ))
    .await;

    let check = MetaTagCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.starts_with("Failed to verify meta tag: Failed to fetch"));
    assert!(outcome.detail.contains("503"));
}

#[tokio::test]
async fn meta_tag_slow_server_times_out() {
    let domain = serve(Router::new().route(
        "/",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "too late"
        }),
    ))
    .await;

    let check = MetaTagCheck::new(&short_timeout()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.starts_with("Failed to verify meta tag:"));
}

#[tokio::test]
async fn unreachable_host_fails_without_panicking() {
    // bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let check = WellKnownFileCheck::new(&short_timeout()).unwrap();
    let outcome = check.check(&format!("localhost:{port}"), TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.starts_with("Failed to verify file:"));
}

#[tokio::test]
async fn well_known_file_with_expected_token_verifies() {
    let domain = serve(well_known(
        r#"{"verification": "scrapesafe-1f0c7f2e-0000-4000-8000-000000000001"}"#,
    ))
    .await;

    let check = WellKnownFileCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(outcome.success, "{}", outcome.detail);
    assert_eq!(
        outcome.detail,
        "Found valid verification file at /.well-known/scrapesafe.json"
    );
}

#[tokio::test]
async fn well_known_file_wrong_token_fails() {
    let domain = serve(well_known(r#"{"verification": "wrong-token"}"#)).await;

    let check = WellKnownFileCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert_eq!(
        outcome.detail,
        format!("Token mismatch in verification file. Expected: {TOKEN}")
    );
}

#[tokio::test]
async fn well_known_file_invalid_json_fails() {
    let domain = serve(well_known("verification=scrapesafe")).await;

    let check = WellKnownFileCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.contains("invalid JSON"));
}

#[tokio::test]
async fn well_known_file_missing_is_a_failure() {
    let domain = serve(Router::new()).await;

    let check = WellKnownFileCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.contains("404"));
}

#[tokio::test]
async fn meta_tag_with_padded_content_fails() {
    let domain = serve(html_page(
        r#"<meta name="scrapesafe" content="  scrapesafe-1f0c7f2e-0000-4000-8000-000000000001  ">"#,
    ))
    .await;

    let check = MetaTagCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.starts_with("Meta tag not found or token mismatch"));
}

#[tokio::test]
async fn well_known_file_with_padded_token_fails() {
    let domain = serve(well_known(
        r#"{"verification": " scrapesafe-1f0c7f2e-0000-4000-8000-000000000001 "}"#,
    ))
    .await;

    let check = WellKnownFileCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.starts_with("Token mismatch in verification file"));
}

#[tokio::test]
async fn oversized_page_is_rejected() {
    let domain = serve(Router::new().route(
        "/",
        get(|| async { "x".repeat(MAX_BODY_BYTES + 1) }),
    ))
    .await;

    let check = MetaTagCheck::new(&VerificationConfig::default()).unwrap();
    let outcome = check.check(&domain, TOKEN).await;
    assert!(!outcome.success);
    assert!(outcome.detail.starts_with("Failed to verify meta tag:"));
    assert!(outcome.detail.contains("exceeds"), "{}", outcome.detail);
}

#[tokio::test]
async fn body_limit_applies_to_fetches() {
    let domain = serve(well_known(r#"{"verification": "0123456789abcdef"}"#)).await;
    let url = site_url(&domain, "/.well-known/scrapesafe.json");
    let client = build_client(&VerificationConfig::default()).unwrap();

    let err = fetch_text_limited(&client, &url, 8).await.unwrap_err();
    assert!(matches!(err, FetchError::TooLarge { limit: 8, .. }), "{err}");

    let body = fetch_text_limited(&client, &url, 1024).await.unwrap();
    assert!(body.contains("0123456789abcdef"));
}
