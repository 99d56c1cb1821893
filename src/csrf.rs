//! Cross-site request forgery protection.
//!
//! Double-submit pattern: a random per-session secret lives in the `_csrf`
//! cookie and every rendered form or JSON client echoes back a token derived
//! from it (`salt.mac`, mac = HMAC-SHA256 over `salt.secret`). Mutating
//! requests without a matching token are rejected before any route handler
//! or auth extractor runs.
//!
//! The secret is independent of the auth cookies, so a silent access-token
//! refresh never changes which tokens are valid.

use std::sync::Arc;

use axum::{
    Json,
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use openssl::{hash::MessageDigest, pkey::PKey, sign::Signer};

use crate::auth::{CookieSettings, get_cookie};

/// Cookie holding the per-session secret.
pub const CSRF_COOKIE_NAME: &str = "_csrf";

/// Header carrying the token on JSON/fetch requests.
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Form field carrying the token on urlencoded submissions.
pub const CSRF_FORM_FIELD: &str = "_csrf";

const SECRET_LEN: usize = 24;
const SALT_LEN: usize = 8;
const MAX_FORM_BYTES: usize = 64 * 1024;

/// CSRF signing configuration.
pub struct CsrfConfig {
    key: Vec<u8>,
    cookies: CookieSettings,
}

/// Anti-forgery token for the current request, to embed in forms.
#[derive(Debug, Clone)]
pub struct CsrfToken(pub String);

impl CsrfConfig {
    pub fn new(key: &[u8], cookies: CookieSettings) -> Self {
        Self {
            key: key.to_vec(),
            cookies,
        }
    }

    fn mac(&self, salt: &str, secret: &str) -> Option<Vec<u8>> {
        let pkey = PKey::hmac(&self.key).ok()?;
        let mut signer = Signer::new(MessageDigest::sha256(), &pkey).ok()?;
        signer.update(salt.as_bytes()).ok()?;
        signer.update(b".").ok()?;
        signer.update(secret.as_bytes()).ok()?;
        signer.sign_to_vec().ok()
    }

    /// Derive a fresh token from a session secret.
    pub fn generate_token(&self, secret: &str) -> Option<String> {
        let salt = URL_SAFE_NO_PAD.encode(rand::random::<[u8; SALT_LEN]>());
        let mac = self.mac(&salt, secret)?;
        Some(format!("{}.{}", salt, URL_SAFE_NO_PAD.encode(mac)))
    }

    /// Check that `token` was derived from `secret`.
    pub fn verify_token(&self, secret: &str, token: &str) -> bool {
        let Some((salt, mac)) = token.split_once('.') else {
            return false;
        };
        let Ok(presented) = URL_SAFE_NO_PAD.decode(mac) else {
            return false;
        };
        let Some(expected) = self.mac(salt, secret) else {
            return false;
        };
        presented.len() == expected.len() && openssl::memcmp::eq(&presented, &expected)
    }
}

fn new_secret() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; SECRET_LEN]>())
}

fn is_well_formed_secret(secret: &str) -> bool {
    URL_SAFE_NO_PAD
        .decode(secret)
        .is_ok_and(|bytes| bytes.len() == SECRET_LEN)
}

fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

fn wants_json(headers: &HeaderMap) -> bool {
    let accepts = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"))
    };
    accepts(header::ACCEPT) || accepts(header::CONTENT_TYPE)
}

/// Rejection for a missing or mismatched anti-forgery token.
pub struct ForgeryCheckFailed {
    json: bool,
}

impl IntoResponse for ForgeryCheckFailed {
    fn into_response(self) -> Response {
        if self.json {
            (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "CSRF token validation failed" })),
            )
                .into_response()
        } else {
            (StatusCode::FORBIDDEN, "CSRF token validation failed.").into_response()
        }
    }
}

/// Pull the token from the header, or from the urlencoded body.
/// Returns the request rebuilt around the buffered body.
async fn presented_token(request: Request) -> (Option<String>, Request) {
    let header_token = request
        .headers()
        .get(CSRF_HEADER_NAME)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if header_token.is_some() {
        return (header_token, request);
    }

    if !is_form(request.headers()) {
        return (None, request);
    }

    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_FORM_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return (None, Request::from_parts(parts, Body::empty())),
    };
    let token = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned());

    (token, Request::from_parts(parts, Body::from(bytes)))
}

/// Middleware issuing the session secret and enforcing tokens on mutating requests.
/// Install as the outermost layer so it runs before any authentication.
pub async fn csrf_protect(
    State(config): State<Arc<CsrfConfig>>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = get_cookie(request.headers(), CSRF_COOKIE_NAME)
        .filter(|s| is_well_formed_secret(s))
        .map(str::to_string);

    if is_mutating(request.method()) {
        let json = wants_json(request.headers());
        let (token, rebuilt) = presented_token(request).await;
        request = rebuilt;

        let valid = match (&existing, &token) {
            (Some(secret), Some(token)) => config.verify_token(secret, token),
            _ => false,
        };
        if !valid {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                has_secret = existing.is_some(),
                has_token = token.is_some(),
                "CSRF token validation failed"
            );
            return ForgeryCheckFailed { json }.into_response();
        }
    }

    let (secret, is_new) = match existing {
        Some(secret) => (secret, false),
        None => (new_secret(), true),
    };

    match config.generate_token(&secret) {
        Some(token) => {
            request.extensions_mut().insert(CsrfToken(token));
        }
        None => tracing::error!("Failed to derive CSRF token"),
    }

    let mut response = next.run(request).await;

    if is_new {
        let cookie = config.cookies.build_session(CSRF_COOKIE_NAME, &secret);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CsrfToken>()
            .cloned()
            .ok_or_else(|| {
                tracing::error!("CsrfToken requested on a route without csrf_protect");
                StatusCode::INTERNAL_SERVER_ERROR
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, middleware, routing::get};
    use tower::ServiceExt;

    fn config() -> Arc<CsrfConfig> {
        Arc::new(CsrfConfig::new(b"csrf-key-for-testing", CookieSettings::new(false)))
    }

    #[test]
    fn test_token_roundtrip() {
        let config = config();
        let secret = new_secret();

        let token = config.generate_token(&secret).unwrap();
        assert!(config.verify_token(&secret, &token));
    }

    #[test]
    fn test_each_render_gets_a_different_valid_token() {
        let config = config();
        let secret = new_secret();

        let a = config.generate_token(&secret).unwrap();
        let b = config.generate_token(&secret).unwrap();
        assert_ne!(a, b);
        assert!(config.verify_token(&secret, &a));
        assert!(config.verify_token(&secret, &b));
    }

    #[test]
    fn test_token_bound_to_secret_and_key() {
        let config = config();
        let secret = new_secret();
        let token = config.generate_token(&secret).unwrap();

        assert!(!config.verify_token(&new_secret(), &token));

        let other = CsrfConfig::new(b"another-key", CookieSettings::new(false));
        assert!(!other.verify_token(&secret, &token));
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        let config = config();
        let secret = new_secret();

        assert!(!config.verify_token(&secret, ""));
        assert!(!config.verify_token(&secret, "no-dot"));
        assert!(!config.verify_token(&secret, "salt.!!!"));
        assert!(!config.verify_token(&secret, "salt.c2hvcnQ"));
    }

    #[test]
    fn test_secret_shape() {
        assert!(is_well_formed_secret(&new_secret()));
        assert!(!is_well_formed_secret("short"));
    }

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|CsrfToken(token): CsrfToken| async move { token })
                    .post(|| async { "mutated" }),
            )
            .layer(middleware::from_fn_with_state(config(), csrf_protect))
    }

    #[tokio::test]
    async fn test_get_issues_secret_cookie() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("_csrf="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[tokio::test]
    async fn test_post_without_secret_rejected() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(CSRF_HEADER_NAME, "anything.abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_post_with_header_token_accepted() {
        let config = config();
        let secret = new_secret();
        let token = config.generate_token(&secret).unwrap();

        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::COOKIE, format!("_csrf={}", secret))
                    .header(CSRF_HEADER_NAME, token)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_post_with_form_field_accepted_and_body_preserved() {
        let config = config();
        let secret = new_secret();
        let token = config.generate_token(&secret).unwrap();

        let app = Router::new()
            .route(
                "/",
                axum::routing::post(|body: String| async move { body }),
            )
            .layer(middleware::from_fn_with_state(config, csrf_protect));

        let form = format!("title=hello&_csrf={}", token);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header(header::COOKIE, format!("_csrf={}", secret))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form.clone()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, form.as_bytes());
    }

    #[tokio::test]
    async fn test_json_clients_get_json_rejection() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/")
                    .header(header::ACCEPT, "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "CSRF token validation failed");
    }
}
