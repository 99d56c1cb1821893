//! Cookie parsing and building for authentication.
//!
//! Every auth cookie is built here so that login, silent refresh and the
//! refresh endpoint emit identical security attributes.

use axum::http::header;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "token";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Attributes shared by all cookies set by the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieSettings {
    /// Add the `Secure` flag (production deployments served over HTTPS)
    pub secure: bool,
}

impl CookieSettings {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    fn secure_suffix(&self) -> &'static str {
        if self.secure { "; Secure" } else { "" }
    }

    /// `Set-Cookie` value with an explicit lifetime.
    pub fn build(&self, name: &str, value: &str, max_age: u64) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
            name,
            value,
            max_age,
            self.secure_suffix()
        )
    }

    /// `Set-Cookie` value that lives for the browser session.
    pub fn build_session(&self, name: &str, value: &str) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Strict; Path=/{}",
            name,
            value,
            self.secure_suffix()
        )
    }

    /// `Set-Cookie` value that clears the named cookie.
    pub fn clear(&self, name: &str) -> String {
        self.build(name, "", 0)
    }

    pub fn access(&self, token: &str, max_age: u64) -> String {
        self.build(ACCESS_COOKIE_NAME, token, max_age)
    }

    pub fn refresh(&self, token: &str, max_age: u64) -> String {
        self.build(REFRESH_COOKIE_NAME, token, max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_get_cookie_simple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token=abc123"));

        assert_eq!(get_cookie(&headers, "token"), Some("abc123"));
    }

    #[test]
    fn test_get_cookie_multiple() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; token=abc123; refreshToken=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "token"), Some("abc123"));
        assert_eq!(get_cookie(&headers, "refreshToken"), Some("xyz789"));
        assert_eq!(get_cookie(&headers, "foo"), Some("bar"));
    }

    #[test]
    fn test_get_cookie_name_is_exact() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("refreshToken=xyz789"),
        );

        assert_eq!(get_cookie(&headers, "token"), None);
    }

    #[test]
    fn test_get_cookie_no_header() {
        let headers = axum::http::HeaderMap::new();
        assert_eq!(get_cookie(&headers, "token"), None);
    }

    #[test]
    fn test_get_cookie_with_spaces() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("  token = abc123  ; foo=bar"),
        );

        assert_eq!(get_cookie(&headers, "token"), Some("abc123"));
    }

    #[test]
    fn test_secure_flag() {
        let insecure = CookieSettings::new(false).access("t", 600);
        assert_eq!(insecure, "token=t; HttpOnly; SameSite=Strict; Path=/; Max-Age=600");

        let secure = CookieSettings::new(true).refresh("r", 604800);
        assert_eq!(
            secure,
            "refreshToken=r; HttpOnly; SameSite=Strict; Path=/; Max-Age=604800; Secure"
        );
    }

    #[test]
    fn test_clear_keeps_attributes() {
        let cleared = CookieSettings::new(true).clear(ACCESS_COOKIE_NAME);
        assert_eq!(cleared, "token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Secure");
    }
}
