//! Minimal server-rendered pages around the session flow.

use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
};

use crate::auth::{Authenticated, AuthenticatedUser, MaybeAuth};
use crate::csrf::{CSRF_FORM_FIELD, CsrfToken};
use crate::state::{AppState, LOGIN_PATH};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route(LOGIN_PATH, get(login_page))
        .route("/profile", get(profile))
}

/// Escape text for inclusion in HTML element content or quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n{}\n</body></html>\n",
        escape_html(title),
        body
    ))
}

fn csrf_input(token: &str) -> String {
    format!(
        "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
        CSRF_FORM_FIELD,
        escape_html(token)
    )
}

fn logout_form(token: &str) -> String {
    format!(
        "<form method=\"post\" action=\"/auth/logout\">{}<button type=\"submit\">Log out</button></form>",
        csrf_input(token)
    )
}

/// Login form, optionally with an error message.
pub fn render_login(error: Option<&str>, csrf_token: &str) -> Html<String> {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>", escape_html(e)))
        .unwrap_or_default();
    let body = format!(
        "<h1>Log in</h1>\n{}\n<form method=\"post\" action=\"/auth/login\">\n{}\n\
         <label>Email <input type=\"email\" name=\"email\"></label>\n\
         <label>Password <input type=\"password\" name=\"password\"></label>\n\
         <button type=\"submit\">Log in</button>\n</form>",
        error,
        csrf_input(csrf_token)
    );
    layout("Log in", &body)
}

fn render_home(user: Option<&AuthenticatedUser>, csrf_token: &str) -> Html<String> {
    let body = match user {
        Some(user) => format!(
            "<h1>Welcome back, {}</h1>\n<p><a href=\"/profile\">Profile</a></p>\n{}",
            escape_html(user.name()),
            logout_form(csrf_token)
        ),
        None => format!(
            "<h1>Welcome</h1>\n<p><a href=\"{}\">Log in</a></p>",
            LOGIN_PATH
        ),
    };
    layout("Home", &body)
}

fn render_profile(user: &AuthenticatedUser, csrf_token: &str) -> Html<String> {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n{}",
        escape_html(user.name()),
        escape_html(user.email()),
        logout_form(csrf_token)
    );
    layout("Profile", &body)
}

/// Fallback for unknown paths. Registered before the layers so that CSRF
/// checks apply to it as well.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, layout("Not found", "<h1>Not found</h1>"))
}

async fn home(MaybeAuth(user): MaybeAuth, CsrfToken(token): CsrfToken) -> impl IntoResponse {
    render_home(user.as_ref(), &token)
}

async fn login_page(CsrfToken(token): CsrfToken) -> impl IntoResponse {
    render_login(None, &token)
}

async fn profile(
    Authenticated(user): Authenticated,
    CsrfToken(token): CsrfToken,
) -> impl IntoResponse {
    render_profile(&user, &token)
}
