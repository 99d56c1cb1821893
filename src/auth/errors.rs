//! Authentication error types.

use axum::response::{IntoResponse, Response};

/// Why a request could not be given an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No access or refresh cookie where one was required
    MissingCredential,
    /// A token failed cryptographic verification
    InvalidSignature,
    /// Access token signature is valid but its window has passed.
    /// The gate falls through to the refresh token instead, so it never
    /// returns this; it is reported only by direct codec callers.
    Expired,
    /// Refresh token verifies but is not in the registry
    RevokedOrUnknownRefresh,
    /// Token could not be minted
    Internal,
}

impl AuthErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorKind::MissingCredential => "Not authenticated",
            AuthErrorKind::InvalidSignature => "Invalid token",
            AuthErrorKind::Expired => "Token has expired",
            AuthErrorKind::RevokedOrUnknownRefresh => "Token has been revoked",
            AuthErrorKind::Internal => "Internal error",
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// API authentication errors (returns JSON).
#[derive(Debug)]
pub struct ApiAuthError(pub AuthErrorKind);

impl ApiAuthError {
    fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self.0 {
            AuthErrorKind::MissingCredential
            | AuthErrorKind::InvalidSignature
            | AuthErrorKind::Expired => StatusCode::UNAUTHORIZED,
            AuthErrorKind::RevokedOrUnknownRefresh => StatusCode::FORBIDDEN,
            AuthErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self(kind)
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        use axum::Json;
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.0.message(),
            }),
        )
            .into_response()
    }
}

/// Page authentication error - redirects to login without clearing cookies.
#[derive(Debug)]
pub struct PageAuthError {
    pub login_path: String,
}

impl IntoResponse for PageAuthError {
    fn into_response(self) -> Response {
        axum::response::Redirect::to(&self.login_path).into_response()
    }
}
