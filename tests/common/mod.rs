#![allow(dead_code)]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use sparrow::{
    ServerConfig,
    auth::MemoryRegistry,
    create_app,
    credentials::MemoryCredentials,
    jwt::{ACCESS_TOKEN_DURATION_SECS, IdentityClaim, JwtConfig},
};
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";
pub const CSRF_SECRET: &[u8] = b"test-csrf-secret-0123456789abcdef";

pub const ALICE_NAME: &str = "Alice";
pub const ALICE_EMAIL: &str = "alice@example.com";
pub const ALICE_PASSWORD: &str = "correct-horse!";

pub struct TestApp {
    pub app: Router,
    pub registry: Arc<MemoryRegistry>,
    pub credentials: Arc<MemoryCredentials>,
    pub jwt: JwtConfig,
}

pub fn create_test_app() -> TestApp {
    create_test_app_with_secure(false)
}

/// App with one user (Alice), no login rate limit.
pub fn create_test_app_with_secure(secure_cookies: bool) -> TestApp {
    let registry = Arc::new(MemoryRegistry::new());
    let credentials = Arc::new(MemoryCredentials::new());
    credentials
        .add_user(ALICE_NAME, ALICE_EMAIL, ALICE_PASSWORD)
        .unwrap();

    let config = ServerConfig {
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        csrf_secret: CSRF_SECRET.to_vec(),
        secure_cookies,
        registry: registry.clone(),
        credentials: credentials.clone(),
        login_rate_limit: None,
        trust_forwarded_for: false,
    };

    TestApp {
        app: create_app(&config),
        registry,
        credentials,
        jwt: JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET),
    }
}

pub fn alice() -> IdentityClaim {
    IdentityClaim {
        name: ALICE_NAME.to_string(),
        email: ALICE_EMAIL.to_string(),
    }
}

/// Extract Set-Cookie headers from response
pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Full Set-Cookie line for the named cookie, if any.
pub fn find_set_cookie(cookies: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    cookies.iter().find(|c| c.starts_with(&prefix)).cloned()
}

/// Value of the named cookie in a list of Set-Cookie lines.
pub fn set_cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let line = find_set_cookie(cookies, name)?;
    let (pair, _) = line.split_once(';').unwrap_or((&line, ""));
    pair.split_once('=').map(|(_, v)| v.to_string())
}

/// Attributes of a Set-Cookie line (everything after the value).
pub fn cookie_attributes(line: &str) -> String {
    line.split_once(';')
        .map(|(_, attrs)| attrs.trim().to_string())
        .unwrap_or_default()
}

/// Check if cookies contain the named cookie being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], name: &str) -> bool {
    find_set_cookie(cookies, name).is_some_and(|c| c.contains("Max-Age=0"))
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub async fn body_string(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// A browser's CSRF state: the `_csrf` cookie value and a token derived from it.
pub struct CsrfSession {
    pub secret: String,
    pub token: String,
}

impl CsrfSession {
    pub fn cookie(&self) -> String {
        format!("_csrf={}", self.secret)
    }
}

/// Obtain a CSRF secret cookie and token the way a JSON client would.
pub async fn fetch_csrf(app: &Router) -> CsrfSession {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/csrf-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookies = extract_set_cookies(&response);
    let secret = set_cookie_value(&cookies, "_csrf").expect("csrf cookie should be issued");
    let json = body_json(response).await;
    let token = json["csrfToken"].as_str().unwrap().to_string();

    CsrfSession { secret, token }
}

pub fn form_body(fields: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish()
}

/// POST the login form with a valid CSRF token.
pub async fn login(
    app: &Router,
    csrf: &CsrfSession,
    email: &str,
    password: &str,
) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header("content-type", "application/x-www-form-urlencoded")
                .header("cookie", csrf.cookie())
                .body(Body::from(form_body(&[
                    ("email", email),
                    ("password", password),
                    ("_csrf", csrf.token.as_str()),
                ])))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Log Alice in and return (access token, refresh token).
pub async fn login_alice(app: &Router, csrf: &CsrfSession) -> (String, String) {
    let response = login(app, csrf, ALICE_EMAIL, ALICE_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cookies = extract_set_cookies(&response);
    (
        set_cookie_value(&cookies, "token").expect("access cookie"),
        set_cookie_value(&cookies, "refreshToken").expect("refresh cookie"),
    )
}

/// An access token for `identity` whose 10-minute window has already passed.
pub fn expired_access_token(jwt: &JwtConfig, identity: &IdentityClaim) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    jwt.generate_access_token_at(identity, now - ACCESS_TOKEN_DURATION_SECS - 30)
        .unwrap()
        .token
}

pub async fn get(app: &Router, uri: &str, cookie: &str) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if !cookie.is_empty() {
        builder = builder.header("cookie", cookie);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// POST logout with the given auth cookies and CSRF session.
pub async fn logout(app: &Router, csrf: &CsrfSession, auth_cookie: &str) -> Response<Body> {
    let cookie = if auth_cookie.is_empty() {
        csrf.cookie()
    } else {
        format!("{}; {}", auth_cookie, csrf.cookie())
    };
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header("cookie", cookie)
                .header("x-csrf-token", &csrf.token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}
