mod error;
mod session;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::rate_limit::{LoginRateLimit, rate_limit_login};
use crate::state::AppState;

pub use error::ApiError;
pub use session::{LANDING_PATH, PUBLIC_PATH};

/// Create the `/auth` router.
pub fn create_auth_router(login_rate_limit: Option<Arc<LoginRateLimit>>) -> Router<AppState> {
    let login_route = match login_rate_limit {
        Some(limit) => {
            post(session::login).layer(middleware::from_fn_with_state(limit, rate_limit_login))
        }
        None => post(session::login),
    };

    Router::new()
        .route("/login", login_route)
        .route("/logout", post(session::logout))
        .route("/refresh-token", get(session::refresh_token))
        .route("/session", get(session::session))
        .route("/csrf-token", get(session::csrf_token))
}
