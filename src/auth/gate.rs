//! Session resolution for an inbound request.
//!
//! The gate only decides; rendering a redirect or a JSON rejection is left to
//! the extractor that called it.

use axum::http::HeaderMap;

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, get_cookie};
use super::errors::AuthErrorKind;
use super::issuer::TokenIssuer;
use crate::jwt::{AccessTokenResult, IdentityClaim};

/// Outcome of resolving a request's session cookies.
#[derive(Debug)]
pub enum GateOutcome {
    Authenticated {
        identity: IdentityClaim,
        /// Set when the access token was re-minted from the refresh token
        refreshed: Option<AccessTokenResult>,
    },
    Unauthenticated(AuthErrorKind),
}

impl GateOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, GateOutcome::Authenticated { .. })
    }
}

fn non_empty_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    get_cookie(headers, name).filter(|value| !value.is_empty())
}

/// Resolve the identity behind a request's `token` / `refreshToken` cookies.
///
/// 1. No access cookie (or an empty one): unauthenticated.
/// 2. Access token verifies: authenticated.
/// 3. Access token expired or invalid: fall back to the refresh token, which
///    must be registered and correctly signed; a new access token is minted
///    from its claim.
pub fn resolve_session(headers: &HeaderMap, issuer: &TokenIssuer) -> GateOutcome {
    let Some(access_token) = non_empty_cookie(headers, ACCESS_COOKIE_NAME) else {
        return GateOutcome::Unauthenticated(AuthErrorKind::MissingCredential);
    };

    match issuer.jwt().validate_access_token(access_token) {
        Ok(identity) => {
            return GateOutcome::Authenticated {
                identity,
                refreshed: None,
            };
        }
        Err(e) => tracing::debug!(reason = %e, "Access token rejected, trying refresh token"),
    }

    let Some(refresh_token) = non_empty_cookie(headers, REFRESH_COOKIE_NAME) else {
        return GateOutcome::Unauthenticated(AuthErrorKind::MissingCredential);
    };

    match issuer.exchange_refresh_token(refresh_token) {
        Ok((identity, access)) => {
            tracing::debug!(email = %identity.email, "Issued new access token from refresh token");
            GateOutcome::Authenticated {
                identity,
                refreshed: Some(access),
            }
        }
        Err(kind) => GateOutcome::Unauthenticated(kind),
    }
}
