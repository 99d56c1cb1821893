//! Token issuance and refresh-token exchange.

use std::sync::Arc;

use super::errors::AuthErrorKind;
use super::registry::RevocationRegistry;
use crate::jwt::{AccessTokenResult, IdentityClaim, JwtConfig, JwtError, RefreshTokenResult};

/// Mints tokens and keeps the revocation registry in step with them.
#[derive(Clone)]
pub struct TokenIssuer {
    jwt: Arc<JwtConfig>,
    registry: Arc<dyn RevocationRegistry>,
}

impl TokenIssuer {
    pub fn new(jwt: Arc<JwtConfig>, registry: Arc<dyn RevocationRegistry>) -> Self {
        Self { jwt, registry }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    pub fn issue_access_token(
        &self,
        identity: &IdentityClaim,
    ) -> Result<AccessTokenResult, JwtError> {
        self.jwt.generate_access_token(identity)
    }

    /// Mint a refresh token and register it. Every call grows the registry.
    pub fn issue_refresh_token(
        &self,
        identity: &IdentityClaim,
    ) -> Result<RefreshTokenResult, JwtError> {
        let result = self.jwt.generate_refresh_token(identity)?;
        self.registry.add(&result.token);
        Ok(result)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Registry membership is checked before the signature; both must pass.
    pub fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<(IdentityClaim, AccessTokenResult), AuthErrorKind> {
        if !self.registry.contains(refresh_token) {
            return Err(AuthErrorKind::RevokedOrUnknownRefresh);
        }

        let identity = self
            .jwt
            .validate_refresh_token(refresh_token)
            .map_err(|_| AuthErrorKind::InvalidSignature)?;

        let access = self.jwt.generate_access_token(&identity).map_err(|e| {
            tracing::error!("Failed to generate access token: {}", e);
            AuthErrorKind::Internal
        })?;

        Ok((identity, access))
    }

    /// Revoke a refresh token. Returns whether it was registered.
    pub fn revoke(&self, refresh_token: &str) -> bool {
        self.registry.remove(refresh_token)
    }
}
