pub mod api;
pub mod auth;
pub mod cli;
pub mod credentials;
pub mod csrf;
pub mod headers;
pub mod jwt;
pub mod pages;
pub mod rate_limit;
pub mod state;

use std::num::NonZeroU32;
use std::sync::Arc;

use api::create_auth_router;
use auth::{CookieSettings, RevocationRegistry, TokenIssuer, add_access_token_cookie};
use axum::{Router, middleware};
use credentials::CredentialCheck;
use csrf::{CsrfConfig, csrf_protect};
use headers::security_headers;
use jwt::JwtConfig;
use rate_limit::LoginRateLimit;
use state::AppState;

pub struct ServerConfig {
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens (must differ from the access secret)
    pub refresh_secret: Vec<u8>,
    /// Key for deriving anti-forgery tokens
    pub csrf_secret: Vec<u8>,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Store of refresh tokens that may still be exchanged
    pub registry: Arc<dyn RevocationRegistry>,
    /// Email/password verification
    pub credentials: Arc<dyn CredentialCheck>,
    /// Login attempts per minute per client IP, `None` to disable
    pub login_rate_limit: Option<NonZeroU32>,
    /// Key the login rate limit on `X-Forwarded-For` (requires a trusted proxy)
    pub trust_forwarded_for: bool,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.access_secret, &config.refresh_secret));
    let cookies = CookieSettings::new(config.secure_cookies);

    let state = AppState {
        issuer: TokenIssuer::new(jwt, config.registry.clone()),
        credentials: config.credentials.clone(),
        cookies,
    };

    let csrf = Arc::new(CsrfConfig::new(&config.csrf_secret, cookies));

    let login_rate_limit = config
        .login_rate_limit
        .map(|n| Arc::new(LoginRateLimit::new(n, config.trust_forwarded_for)));

    // Layer order (outermost last): headers, CSRF, refreshed-cookie collection.
    // CSRF runs before any auth extractor so rejections leak no session state.
    Router::new()
        .merge(pages::router())
        .nest("/auth", create_auth_router(login_rate_limit))
        .fallback(pages::not_found)
        .layer(middleware::from_fn(add_access_token_cookie))
        .layer(middleware::from_fn_with_state(csrf, csrf_protect))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}
