//! Shared test harness: an app wired to in-memory stores plus small
//! request/response helpers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderName, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use lectio_api::auth::claims::ClaimsCodec;
use lectio_api::auth::password::hash_password;
use lectio_api::auth::session::SessionManager;
use lectio_api::auth::{AuthConfig, FingerprintPolicy};
use lectio_api::config::ServerConfig;
use lectio_api::routes;
use lectio_api::state::AppState;
use lectio_db::repositories::MemoryUserDirectory;
use lectio_db::store::MemorySessionStore;

/// Build a test `ServerConfig` with a fixed signing secret and the default
/// fingerprint policy.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        auth: AuthConfig {
            jwt_secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_ttl_mins: 15,
            refresh_ttl_days: 7,
            fingerprint_policy: FingerprintPolicy::Reject,
            cookie_secure: false,
        },
    }
}

/// An application backed by in-memory stores, plus the seedable user
/// directory behind it.
pub struct TestApp {
    pub router: Router,
    pub users: Arc<MemoryUserDirectory>,
}

impl TestApp {
    /// Seed a user and return its id. The password is stored Argon2id-hashed,
    /// exactly as production would.
    pub async fn seed_user(&self, username: &str, password: &str) -> i64 {
        let hash = hash_password(password).expect("hashing should succeed");
        self.users
            .add(username, &format!("{username}@test.com"), &hash)
            .await
    }
}

/// Build the full application router with the same middleware stack as
/// `main.rs`, wired to in-memory session and user stores.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let codec = Arc::new(ClaimsCodec::new(&config.auth.jwt_secret));
    let store = Arc::new(MemorySessionStore::new());
    let sessions = Arc::new(SessionManager::new(
        store,
        Arc::clone(&codec),
        config.auth.clone(),
    ));
    let users = Arc::new(MemoryUserDirectory::new());

    let state = AppState {
        config: Arc::new(config),
        codec,
        sessions,
        users: users.clone(),
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    let router = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state);

    TestApp { router, users }
}

/// POST a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body with a Bearer token.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body with a refresh cookie (`name=value`).
pub async fn post_json_cookie(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    cookie: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header(COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be valid JSON")
}

/// Pull a named cookie's raw `Set-Cookie` header value out of a response.
pub fn set_cookie_header(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .map(|v| v.to_string())
}

/// Pull a named cookie's value out of a response's `Set-Cookie` headers.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    let header = set_cookie_header(response, name)?;
    let pair = header.split(';').next()?;
    pair.split_once('=').map(|(_, v)| v.to_string())
}
