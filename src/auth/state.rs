//! Authentication state traits.

use super::cookie::CookieSettings;
use super::issuer::TokenIssuer;

/// Trait for state types that provide what the session gate needs.
pub trait HasAuthBackend {
    fn issuer(&self) -> &TokenIssuer;
    fn cookie_settings(&self) -> CookieSettings;
}

/// Trait for state types that gate server-rendered pages.
/// Extends `HasAuthBackend` with the login path for redirects.
pub trait HasPageAuthBackend: HasAuthBackend {
    fn login_path(&self) -> &str;
}
