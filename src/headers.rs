//! Security response headers.

use axum::{
    body::Body,
    http::{HeaderValue, Request, Response, header},
    middleware::Next,
};

// Pages are plain server-rendered forms: no scripts, same-origin everything.
const CSP_HEADER_VALUE: &str = "default-src 'self'; \
     script-src 'self'; \
     style-src 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'; \
     base-uri 'self'; \
     object-src 'none'";

/// Middleware that adds CSP and related headers to responses.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CSP_HEADER_VALUE),
    );

    // Prevent MIME sniffing
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );

    // Fallback for browsers without frame-ancestors
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    response
}
