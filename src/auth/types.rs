//! Authentication user types.

use crate::jwt::IdentityClaim;

/// Identity resolved for the current request.
///
/// Reflects the login-time snapshot, not the current stored user.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub identity: IdentityClaim,
    /// Whether a new access token was minted for this request
    pub refreshed: bool,
}

impl AuthenticatedUser {
    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn email(&self) -> &str {
        &self.identity.email
    }
}
