//! Session endpoints.
//!
//! - POST `/login` - Check credentials, set both auth cookies
//! - POST `/logout` - Revoke refresh token and clear cookies
//! - GET `/refresh-token` - Exchange refresh token for new access token (JSON)
//! - GET `/session` - Identity of the current session (JSON)
//! - GET `/csrf-token` - Anti-forgery token for JSON clients

use axum::{
    Form, Json,
    extract::{Request, State},
    http::{StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::error::ApiError;
use crate::auth::{
    ACCESS_COOKIE_NAME, ApiAuth, AuthErrorKind, REFRESH_COOKIE_NAME, get_cookie,
};
use crate::credentials::CredentialError;
use crate::csrf::CsrfToken;
use crate::pages::render_login;
use crate::state::AppState;

/// Where a successful login lands.
pub const LANDING_PATH: &str = "/profile";

/// Where logout lands.
pub const PUBLIC_PATH: &str = "/";

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn login_error(status: StatusCode, message: &str, csrf_token: &str) -> Response {
    (status, render_login(Some(message), csrf_token)).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    CsrfToken(csrf_token): CsrfToken,
    Form(form): Form<LoginForm>,
) -> Response {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return login_error(
            StatusCode::BAD_REQUEST,
            "Email and password are required.",
            &csrf_token,
        );
    }

    let identity = match state
        .credentials
        .check_credentials(email, &form.password)
        .await
    {
        Ok(identity) => identity,
        Err(CredentialError::InvalidCredentials) => {
            warn!("Failed login attempt");
            return login_error(StatusCode::FORBIDDEN, "Invalid credentials.", &csrf_token);
        }
        Err(e) => {
            error!("Credential check failed: {}", e);
            return login_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error.",
                &csrf_token,
            );
        }
    };

    let tokens = state
        .issuer
        .issue_access_token(&identity)
        .and_then(|access| {
            state
                .issuer
                .issue_refresh_token(&identity)
                .map(|refresh| (access, refresh))
        });
    let (access, refresh) = match tokens {
        Ok(tokens) => tokens,
        Err(e) => {
            error!("Failed to issue tokens: {}", e);
            return login_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error.",
                &csrf_token,
            );
        }
    };

    info!(email = %identity.email, "User logged in");

    let access_cookie = state.cookies.access(&access.token, access.duration);
    let refresh_cookie = state.cookies.refresh(&refresh.token, refresh.duration);

    (
        AppendHeaders([(SET_COOKIE, access_cookie), (SET_COOKIE, refresh_cookie)]),
        Redirect::to(LANDING_PATH),
    )
        .into_response()
}

/// Logout - revoke refresh token and clear both cookies. Always succeeds.
pub async fn logout(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    if let Some(refresh_token) = get_cookie(request.headers(), REFRESH_COOKIE_NAME) {
        if state.issuer.revoke(refresh_token) {
            info!("Refresh token revoked on logout");
        }
    }

    let clear_access = state.cookies.clear(ACCESS_COOKIE_NAME);
    let clear_refresh = state.cookies.clear(REFRESH_COOKIE_NAME);

    (
        AppendHeaders([(SET_COOKIE, clear_access), (SET_COOKIE, clear_refresh)]),
        Redirect::to(PUBLIC_PATH),
    )
}

/// Refresh the access token using a registered refresh token.
pub async fn refresh_token(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let refresh_token = get_cookie(request.headers(), REFRESH_COOKIE_NAME)
        .ok_or_else(|| ApiError::forbidden("Invalid refresh token"))?;

    let (identity, access) = state
        .issuer
        .exchange_refresh_token(refresh_token)
        .map_err(|kind| match kind {
            AuthErrorKind::Internal => ApiError::internal("Failed to generate token"),
            _ => ApiError::forbidden("Invalid refresh token"),
        })?;

    tracing::debug!(email = %identity.email, "Access token refreshed via endpoint");

    let access_cookie = state.cookies.access(&access.token, access.duration);

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, access_cookie)],
        Json(serde_json::json!({ "success": true })),
    ))
}

#[derive(Serialize)]
struct SessionResponse {
    name: String,
    email: String,
}

/// Identity of the current session.
pub async fn session(ApiAuth(user): ApiAuth) -> impl IntoResponse {
    Json(SessionResponse {
        name: user.identity.name,
        email: user.identity.email,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsrfTokenResponse {
    csrf_token: String,
}

pub async fn csrf_token(CsrfToken(csrf_token): CsrfToken) -> impl IntoResponse {
    Json(CsrfTokenResponse { csrf_token })
}
