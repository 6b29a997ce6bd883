//! End-to-end tests against the router, backed by the in-memory store and
//! fake Replicate/PayPal clients.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use photo_restore_server::{
    create_app,
    database::{MemoryStore, UserStore},
    errors::{AppError, Result},
    services::{ImageRestorer, OrderVerifier},
    AppState, Config,
};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tempfile::TempDir;
use tower::ServiceExt;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01\x00\x00\x00\x01";
const BOUNDARY: &str = "restore-test-boundary";

struct FakeRestorer {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeRestorer {
    fn working() -> Self {
        Self { fail: false, calls: AtomicUsize::new(0) }
    }

    fn broken() -> Self {
        Self { fail: true, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ImageRestorer for FakeRestorer {
    async fn restore(&self, image_url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(image_url.contains("/uploads/"));
        if self.fail {
            return Err(AppError::Restoration("model crashed".to_string()));
        }
        Ok("https://replicate.delivery/out.png".to_string())
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>> {
        Ok(PNG_BYTES.to_vec())
    }
}

struct RejectingVerifier;

#[async_trait]
impl OrderVerifier for RejectingVerifier {
    async fn verify_order(&self, _order_id: &str, _expected_minor: i64) -> Result<()> {
        Err(AppError::PaymentUnverified("order not completed".to_string()))
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    restorer: Arc<FakeRestorer>,
    uploads: TempDir,
}

fn test_config(upload_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database_url = "memory:".to_string();
    config.upload_dir = upload_dir.path().to_string_lossy().to_string();
    config.jwt_secret = "integration-secret".to_string();
    config
}

fn build_app(
    config: Config,
    uploads: TempDir,
    restorer: FakeRestorer,
    verifier: Option<Arc<dyn OrderVerifier>>,
) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let restorer = Arc::new(restorer);
    let state = AppState::new(
        config,
        store.clone() as Arc<dyn UserStore>,
        restorer.clone() as Arc<dyn ImageRestorer>,
        verifier,
    )
    .expect("state");

    TestApp {
        router: create_app(state),
        store,
        restorer,
        uploads,
    }
}

fn setup() -> TestApp {
    let uploads = TempDir::new().unwrap();
    let config = test_config(&uploads);
    build_app(config, uploads, FakeRestorer::working(), None)
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-auth-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-auth-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

fn restore_request(token: Option<&str>, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    multipart_request(token, "photo", file_name, content_type, data)
}

fn multipart_request(
    token: Option<&str>,
    field: &str,
    file_name: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/restore")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header("x-auth-token", token);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn signup(app: &TestApp, email: &str) -> String {
    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({ "name": "Ada", "email": email, "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signup failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

async fn buy(app: &TestApp, token: &str, plan: &str, qty: i64, order_id: &str) -> (StatusCode, Value) {
    send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/payment-success",
            Some(token),
            json!({ "plan": plan, "orderID": order_id, "payerID": "PAYER1", "qty": qty }),
        ),
    )
    .await
}

async fn credits(app: &TestApp, token: &str) -> i64 {
    let (status, body) = send(&app.router, get_request("/api/auth/user/credits", Some(token))).await;
    assert_eq!(status, StatusCode::OK);
    body["photo_credits"].as_i64().unwrap()
}

#[tokio::test]
async fn test_welcome_and_health() {
    let app = setup();

    let (status, body) = send(&app.router, get_request("/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the Photo-Restore-Pro");

    let (status, body) = send(&app.router, get_request("/health/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["database"], "healthy");
}

#[tokio::test]
async fn test_signup_returns_token_and_fresh_account() {
    let app = setup();

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({ "name": "Ada", "email": "ada@example.com", "password": "secret123" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["plan"], "none");
    assert_eq!(body["user"]["photo_credits"], 0);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_signup_is_rejected() {
    let app = setup();
    signup(&app, "ada@example.com").await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({ "name": "Other", "email": "ada@example.com", "password": "another1" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "User already exists with this email.");
    assert_eq!(app.store.user_count(), 1);
}

#[tokio::test]
async fn test_signup_requires_all_fields() {
    let app = setup();

    let (status, _) = send(
        &app.router,
        json_request("POST", "/api/auth/signup", None, json!({ "email": "a@b.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.user_count(), 0);
}

#[tokio::test]
async fn test_login_checks_password() {
    let app = setup();
    signup(&app, "ada@example.com").await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "wrong-password" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Invalid credentials.");

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_protected_routes_need_token() {
    let app = setup();

    let (status, body) = send(&app.router, get_request("/api/auth/user/credits", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "No token, authorization denied");

    let (status, body) = send(&app.router, get_request("/api/auth", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["msg"], "Token is not valid");

    let (status, _) = send(&app.router, restore_request(None, "a.png", "image/png", PNG_BYTES)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_payment_overwrites_credits() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;

    let (status, body) = buy(&app, &token, "basic", 5, "ORDER-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Plan and credits updated successfully.");
    assert_eq!(body["plan"], "basic");
    assert_eq!(body["photo_credits"], 5);

    let (status, body) = buy(&app, &token, "premium", 2, "ORDER-2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "premium");
    assert_eq!(credits(&app, &token).await, 2);
}

#[tokio::test]
async fn test_replayed_order_is_rejected() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;

    let (status, _) = buy(&app, &token, "basic", 3, "ORDER-1").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = buy(&app, &token, "advanced", 10, "ORDER-1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(credits(&app, &token).await, 3);
    assert_eq!(app.store.payment_count(), 1);
}

#[tokio::test]
async fn test_payment_validation() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/payment-success",
            Some(&token),
            json!({ "plan": "basic", "payerID": "PAYER1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "Missing payment or plan info.");

    let (status, _) = buy(&app, &token, "platinum", 1, "ORDER-X").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = buy(&app, &token, "basic", 0, "ORDER-Y").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(credits(&app, &token).await, 0);
}

#[tokio::test]
async fn test_unverified_order_leaves_account_untouched() {
    let uploads = TempDir::new().unwrap();
    let config = test_config(&uploads);
    let app = build_app(
        config,
        uploads,
        FakeRestorer::working(),
        Some(Arc::new(RejectingVerifier)),
    );
    let token = signup(&app, "ada@example.com").await;

    let (status, _) = buy(&app, &token, "basic", 5, "ORDER-1").await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(credits(&app, &token).await, 0);
    assert_eq!(app.store.payment_count(), 0);
}

#[tokio::test]
async fn test_restore_without_credits_is_forbidden() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;

    let (status, body) = send(
        &app.router,
        restore_request(Some(&token), "old.png", "image/png", PNG_BYTES),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["msg"], "No photo credits remaining.");
    assert_eq!(credits(&app, &token).await, 0);
    assert_eq!(app.restorer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_restore_consumes_one_credit() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 3, "ORDER-1").await;

    let (status, body) = send(
        &app.router,
        restore_request(Some(&token), "grandma.png", "image/png", PNG_BYTES),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["photo_credits"], 2);
    let restored = body["restored"].as_str().unwrap();
    assert!(restored.starts_with("http://localhost:5000/uploads/restored-"));
    assert!(restored.ends_with("grandma.png"));
    assert_eq!(credits(&app, &token).await, 2);

    let file_name = restored.rsplit('/').next().unwrap();
    assert!(app.uploads.path().join(file_name).exists());
}

#[tokio::test]
async fn test_restore_rejects_non_images() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 1, "ORDER-1").await;

    let (status, _) = send(
        &app.router,
        restore_request(Some(&token), "notes.txt", "text/plain", b"hello"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        restore_request(Some(&token), "fake.png", "image/png", b"definitely not a png"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(credits(&app, &token).await, 1);
}

#[tokio::test]
async fn test_concurrent_restores_spend_last_credit_once() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 1, "ORDER-1").await;

    let (first, second) = tokio::join!(
        send(&app.router, restore_request(Some(&token), "a.png", "image/png", PNG_BYTES)),
        send(&app.router, restore_request(Some(&token), "b.png", "image/png", PNG_BYTES)),
    );

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::FORBIDDEN]);
    assert_eq!(credits(&app, &token).await, 0);
}

#[tokio::test]
async fn test_failed_restore_refunds_credit() {
    let uploads = TempDir::new().unwrap();
    let config = test_config(&uploads);
    let app = build_app(config, uploads, FakeRestorer::broken(), None);
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 2, "ORDER-1").await;

    let (status, body) = send(
        &app.router,
        restore_request(Some(&token), "old.png", "image/png", PNG_BYTES),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["msg"], "Error restoring image");
    assert_eq!(credits(&app, &token).await, 2);
}

#[tokio::test]
async fn test_failed_restore_keeps_charge_when_refunds_disabled() {
    let uploads = TempDir::new().unwrap();
    let mut config = test_config(&uploads);
    config.refund_failed_restores = false;
    let app = build_app(config, uploads, FakeRestorer::broken(), None);
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 2, "ORDER-1").await;

    let (status, _) = send(
        &app.router,
        restore_request(Some(&token), "old.png", "image/png", PNG_BYTES),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(credits(&app, &token).await, 1);
}

#[tokio::test]
async fn test_paypal_client_id_lookup() {
    let uploads = TempDir::new().unwrap();
    let mut config = test_config(&uploads);
    config.paypal.sandbox_client_id = Some("sandbox-id".to_string());
    let app = build_app(config, uploads, FakeRestorer::working(), None);

    let (status, body) = send(&app.router, get_request("/api/auth/paypal-client-id", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientId"], "sandbox-id");
    assert_eq!(body["mode"], "sandbox");
    assert_eq!(body["isLive"], false);

    let (status, _) = send(
        &app.router,
        get_request("/api/auth/paypal-client-id?mode=live", None),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = send(
        &app.router,
        get_request("/api/auth/paypal-client-id?mode=bogus", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_paypal_webhook_acknowledges() {
    let app = setup();

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/paypal-webhook",
            None,
            json!({ "event_type": "CHECKOUT.ORDER.APPROVED", "resource": {} }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["msg"], "Webhook received");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup();
    send(&app.router, get_request("/", None)).await;

    let response = app
        .router
        .clone()
        .oneshot(get_request("/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_email_match_ignores_case() {
    let app = setup();
    signup(&app, "Ada@Example.com").await;

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/signup",
            None,
            json!({ "name": "Other", "email": "ada@EXAMPLE.com", "password": "another1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "User already exists with this email.");

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "ADA@example.com", "password": "secret123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_oversized_upload_keeps_credit() {
    let uploads = TempDir::new().unwrap();
    let mut config = test_config(&uploads);
    config.max_file_size = 1024;
    let app = build_app(config, uploads, FakeRestorer::working(), None);
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 2, "ORDER-1").await;

    let mut photo = PNG_BYTES.to_vec();
    photo.resize(4 * 1024, 0);
    let (status, body) = send(
        &app.router,
        restore_request(Some(&token), "big.png", "image/png", &photo),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["msg"], "File too large");
    assert_eq!(credits(&app, &token).await, 2);
    assert_eq!(app.restorer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_restore_without_photo_field() {
    let app = setup();
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 2, "ORDER-1").await;

    let (status, body) = send(
        &app.router,
        multipart_request(Some(&token), "picture", "old.png", "image/png", PNG_BYTES),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["msg"], "No file uploaded.");
    assert_eq!(credits(&app, &token).await, 2);
}

#[tokio::test]
async fn test_restore_relays_provider_url_when_not_persisting() {
    let uploads = TempDir::new().unwrap();
    let mut config = test_config(&uploads);
    config.persist_restored = false;
    let app = build_app(config, uploads, FakeRestorer::working(), None);
    let token = signup(&app, "ada@example.com").await;
    buy(&app, &token, "basic", 2, "ORDER-1").await;

    let (status, body) = send(
        &app.router,
        restore_request(Some(&token), "old.png", "image/png", PNG_BYTES),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["restored"], "https://replicate.delivery/out.png");
    assert_eq!(body["photo_credits"], 1);

    let restored_files = std::fs::read_dir(app.uploads.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("restored-"))
        .count();
    assert_eq!(restored_files, 0);
}

#[tokio::test]
async fn test_paypal_client_id_empty_mode_uses_default() {
    let uploads = TempDir::new().unwrap();
    let mut config = test_config(&uploads);
    config.paypal.sandbox_client_id = Some("sandbox-id".to_string());
    let app = build_app(config, uploads, FakeRestorer::working(), None);

    let (status, body) = send(
        &app.router,
        get_request("/api/auth/paypal-client-id?mode=", None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clientId"], "sandbox-id");
    assert_eq!(body["mode"], "sandbox");
}
