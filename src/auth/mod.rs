//! Cookie-based session authentication.
//!
//! Dual-token system: short-lived access tokens (10 min, stateless) and
//! refresh tokens whose validity is decided by the revocation registry.
//! Expired access tokens are silently re-minted by the extractors and the
//! new cookie is attached by `add_access_token_cookie`.

mod cookie;
mod errors;
mod extractors;
mod gate;
mod issuer;
mod registry;
mod state;
mod types;

pub use cookie::{ACCESS_COOKIE_NAME, CookieSettings, REFRESH_COOKIE_NAME, get_cookie};
pub use errors::{ApiAuthError, AuthErrorKind, PageAuthError};
pub use extractors::{
    ApiAuth, Authenticated, MaybeAuth, NEW_ACCESS_TOKEN_COOKIE, add_access_token_cookie,
};
pub use gate::{GateOutcome, resolve_session};
pub use issuer::TokenIssuer;
pub use registry::{MemoryRegistry, RevocationRegistry};
pub use state::{HasAuthBackend, HasPageAuthBackend};
pub use types::AuthenticatedUser;
