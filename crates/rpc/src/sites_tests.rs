//! Router tests for the `/api/owner` endpoints.

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Instant;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use scrapesafe_site_registry::{
        DomainPolicy, MemorySiteRegistrationStore, RegistrationService, SiteRegistrationStore,
    };
    use scrapesafe_verification::{
        OwnershipCheck, SiteVerifier, StrategySet, VerificationOutcome,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::ip_asset::SimulatedIpRegistrar;
    use crate::server::{build_router, AppState};

    const WALLET: &str = "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    /// Passes when the published token equals the expected one.
    struct PublishedTokens(parking_lot::Mutex<Vec<String>>);

    #[async_trait]
    impl OwnershipCheck for PublishedTokens {
        async fn check(&self, domain: &str, expected_token: &str) -> VerificationOutcome {
            if self.0.lock().iter().any(|t| t == expected_token) {
                VerificationOutcome::success(format!("Found valid token for {domain}"))
            } else {
                VerificationOutcome::failure(format!(
                    "Token not found for {domain}. Expected: {expected_token}"
                ))
            }
        }
    }

    struct TestApp {
        router: Router,
        store: MemorySiteRegistrationStore,
        published: Arc<PublishedTokens>,
    }

    fn create_test_app() -> TestApp {
        let store = MemorySiteRegistrationStore::new();
        let registration = Arc::new(RegistrationService::new(
            Arc::new(store.clone()),
            DomainPolicy::default(),
        ));
        let published = Arc::new(PublishedTokens(parking_lot::Mutex::new(Vec::new())));
        let strategies = StrategySet::new(published.clone(), published.clone(), published.clone());
        let verifier = Arc::new(SiteVerifier::new(Arc::new(store.clone()), strategies));

        let state = AppState {
            registration,
            verifier,
            ip_registrar: Arc::new(SimulatedIpRegistrar),
            node_id: "test-node".to_string(),
            start_time: Instant::now(),
            req_count: Arc::new(AtomicUsize::new(0)),
            metrics: None,
            allowed_origins: Vec::new(),
            dev_mode: false,
        };

        TestApp {
            router: build_router(Arc::new(state)),
            store,
            published,
        }
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(app: &TestApp, domain: &str) -> Value {
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/owner/register",
            Some(json!({ "domain": domain, "ownerWallet": WALLET })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    #[tokio::test]
    async fn test_register_returns_instructions() {
        let app = create_test_app();
        let body = register(&app, "Example.com").await;

        assert_eq!(body["siteId"], 1);
        assert_eq!(body["domain"], "example.com");
        assert_eq!(body["ownerWallet"], WALLET.to_ascii_lowercase());
        assert_eq!(body["verified"], false);
        let token = body["verificationToken"].as_str().unwrap();
        assert!(token.starts_with("scrapesafe-"));

        let methods = &body["verificationMethods"];
        assert_eq!(methods["dns"]["record"], "_scrapesafe.example.com");
        assert_eq!(methods["dns"]["type"], "TXT");
        assert_eq!(methods["dns"]["value"], token);
        assert_eq!(
            methods["metaTag"]["tag"],
            format!(r#"<meta name="scrapesafe" content="{token}">"#)
        );
        assert_eq!(methods["file"]["path"], "/.well-known/scrapesafe.json");
    }

    #[tokio::test]
    async fn test_register_twice_returns_same_claim() {
        let app = create_test_app();
        let first = register(&app, "example.com").await;
        let second = register(&app, "example.com").await;

        assert_eq!(first["siteId"], second["siteId"]);
        assert_eq!(first["verificationToken"], second["verificationToken"]);
        assert_eq!(app.store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_validation_errors() {
        let app = create_test_app();
        let cases = [
            (json!({ "ownerWallet": WALLET }), "Domain is required"),
            (json!({ "domain": "example.com" }), "ownerWallet is required"),
            (
                json!({ "domain": "not a domain", "ownerWallet": WALLET }),
                "Invalid domain format",
            ),
            (
                json!({ "domain": "example.com", "ownerWallet": "0x1234" }),
                "Invalid wallet address format",
            ),
        ];

        for (payload, expected) in cases {
            let (status, body) =
                send(&app.router, Method::POST, "/api/owner/register", Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(
                body["error"].as_str().unwrap().starts_with(expected),
                "{body}"
            );
        }
        assert_eq!(app.store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = create_test_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/owner/verify")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_lookup_by_site_id() {
        let app = create_test_app();
        register(&app, "example.com").await;

        let (status, body) =
            send(&app.router, Method::GET, "/api/owner/register?siteId=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["siteId"], 1);
        assert_eq!(body["verified"], false);
        assert!(body["createdAt"].is_string());

        let (status, body) = send(&app.router, Method::GET, "/api/owner/register", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "siteId is required");

        let (status, _) =
            send(&app.router, Method::GET, "/api/owner/register?siteId=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            send(&app.router, Method::GET, "/api/owner/register?siteId=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "siteId is required");

        let (status, body) =
            send(&app.router, Method::GET, "/api/owner/register?siteId=99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Registration not found");
    }

    #[tokio::test]
    async fn test_list_sites() {
        let app = create_test_app();
        register(&app, "a.example.com").await;
        register(&app, "b.example.com").await;

        let (status, body) = send(&app.router, Method::GET, "/api/owner/sites", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["sites"][0]["domain"], "a.example.com");
        assert_eq!(body["sites"][1]["domain"], "b.example.com");
    }

    #[tokio::test]
    async fn test_verify_failure_then_success() {
        let app = create_test_app();
        let registered = register(&app, "example.com").await;
        let token = registered["verificationToken"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/owner/verify",
            Some(json!({ "siteId": 1, "method": "dns" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert!(body["error"].as_str().unwrap().contains(&token));

        app.published.0.lock().push(token);

        // method defaults to dns
        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/owner/verify",
            Some(json!({ "siteId": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["ok"], true);
        assert_eq!(body["storyIpId"], "story:local:1");
        assert_eq!(body["storySimulated"], true);
        assert!(!body["details"].as_str().unwrap().is_empty());

        let (_, lookup) =
            send(&app.router, Method::GET, "/api/owner/register?siteId=1", None).await;
        assert_eq!(lookup["verified"], true);
    }

    #[tokio::test]
    async fn test_verify_input_errors() {
        let app = create_test_app();
        register(&app, "example.com").await;

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/owner/verify",
            Some(json!({ "siteId": 1, "method": "smoke-signal" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "method must be one of: dns, metaTag, file");

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/owner/verify",
            Some(json!({ "method": "dns" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "siteId is required");

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/owner/verify",
            Some(json!({ "siteId": 0, "method": "dns" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "siteId is required");

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/api/owner/verify",
            Some(json!({ "siteId": 999, "method": "file" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["error"],
            "Registration not found. Please register the domain first."
        );
        assert_eq!(app.store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let app = create_test_app();
        register(&app, "example.com").await;

        let (status, body) = send(&app.router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["registrations"], 1);

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("scrapesafe_api_requests_total 3"));
        assert!(text.contains("scrapesafe_registrations 1"));
    }
}
