//! Shared handler state.

use std::sync::Arc;

use crate::auth::{CookieSettings, HasAuthBackend, HasPageAuthBackend, TokenIssuer};
use crate::credentials::CredentialCheck;

/// Path unauthenticated page requests are redirected to.
pub const LOGIN_PATH: &str = "/login";

#[derive(Clone)]
pub struct AppState {
    pub issuer: TokenIssuer,
    pub credentials: Arc<dyn CredentialCheck>,
    pub cookies: CookieSettings,
}

impl HasAuthBackend for AppState {
    fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    fn cookie_settings(&self) -> CookieSettings {
        self.cookies
    }
}

impl HasPageAuthBackend for AppState {
    fn login_path(&self) -> &str {
        LOGIN_PATH
    }
}
