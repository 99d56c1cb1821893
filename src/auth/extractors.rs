//! Axum extractors for authentication.

use std::cell::RefCell;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::Response,
};

use super::errors::{ApiAuthError, AuthErrorKind, PageAuthError};
use super::gate::{GateOutcome, resolve_session};
use super::state::{HasAuthBackend, HasPageAuthBackend};
use super::types::AuthenticatedUser;

tokio::task_local! {
    /// Task-local storage for the new access token cookie.
    /// Used to pass the cookie from the auth extractor to the response middleware.
    pub static NEW_ACCESS_TOKEN_COOKIE: RefCell<Option<String>>;
}

/// Middleware that appends the access cookie minted during a silent refresh.
/// Must wrap every route that uses the auth extractors.
pub async fn add_access_token_cookie(request: Request, next: Next) -> Response {
    NEW_ACCESS_TOKEN_COOKIE
        .scope(RefCell::new(None), async move {
            let mut response = next.run(request).await;

            let cookie = NEW_ACCESS_TOKEN_COOKIE.with(|cell| cell.borrow_mut().take());
            if let Some(cookie) = cookie {
                match HeaderValue::from_str(&cookie) {
                    Ok(value) => {
                        response.headers_mut().append(SET_COOKIE, value);
                    }
                    Err(e) => tracing::error!("Invalid access cookie header: {}", e),
                }
            }

            response
        })
        .await
}

/// Core authentication logic shared by all auth extractors.
fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    match resolve_session(&parts.headers, state.issuer()) {
        GateOutcome::Authenticated {
            identity,
            refreshed: None,
        } => Ok(AuthenticatedUser {
            identity,
            refreshed: false,
        }),
        GateOutcome::Authenticated {
            identity,
            refreshed: Some(access),
        } => {
            // Same builder as the login path, so attributes match
            let new_cookie = state
                .cookie_settings()
                .access(&access.token, access.duration);
            if NEW_ACCESS_TOKEN_COOKIE
                .try_with(|cell| cell.borrow_mut().replace(new_cookie))
                .is_err()
            {
                tracing::warn!("Refreshed access token outside add_access_token_cookie layer");
            }

            Ok(AuthenticatedUser {
                identity,
                refreshed: true,
            })
        }
        GateOutcome::Unauthenticated(kind) => Err(kind),
    }
}

/// Extractor for pages that require authentication.
/// On failure, redirects to login without clearing cookies.
pub struct Authenticated(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Authenticated
where
    S: HasPageAuthBackend + Send + Sync,
{
    type Rejection = PageAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .map(Authenticated)
            .map_err(|kind| {
                tracing::debug!(reason = %kind, path = %parts.uri.path(), "Redirecting to login");
                PageAuthError {
                    login_path: state.login_path().to_string(),
                }
            })
    }
}

/// Extractor for API endpoints that require authentication.
/// Returns JSON errors instead of redirects.
pub struct ApiAuth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for ApiAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .map(ApiAuth)
            .map_err(ApiAuthError::from)
    }
}

/// Optional authentication extractor - never fails.
/// Useful for pages that render for both guests and signed-in users.
pub struct MaybeAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(authenticate_request(parts, state).ok()))
    }
}
