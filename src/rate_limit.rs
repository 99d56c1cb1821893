//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket algorithm with per-IP tracking to slow down password guessing.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};

/// Per-IP rate limiter.
pub type IpLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Login attempt limiting configuration.
pub struct LoginRateLimit {
    limiter: IpLimiter,
    /// Key on the first `X-Forwarded-For` entry (only safe behind a proxy)
    trust_forwarded_for: bool,
}

impl LoginRateLimit {
    /// Allow `per_minute` attempts per client IP, with the same burst.
    pub fn new(per_minute: NonZeroU32, trust_forwarded_for: bool) -> Self {
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            trust_forwarded_for,
        }
    }
}

/// Extract the client IP used as rate limit key.
fn client_ip(request: &Request, trust_forwarded_for: bool) -> Option<String> {
    if trust_forwarded_for {
        // X-Forwarded-For can contain multiple IPs, take the first (original client)
        return request
            .headers()
            .get("x-forwarded-for")?
            .to_str()
            .ok()?
            .split(',')
            .next()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Middleware for rate limiting login attempts.
pub async fn rate_limit_login(
    State(config): State<Arc<LoginRateLimit>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = client_ip(&request, config.trust_forwarded_for) else {
        return (StatusCode::FORBIDDEN, "Unable to determine client IP.").into_response();
    };

    match config.limiter.check_key(&ip) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            tracing::warn!(ip = %ip, "Login rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many login attempts. Please wait before trying again.",
            )
                .into_response()
        }
    }
}
