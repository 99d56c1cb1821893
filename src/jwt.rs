//! JWT token generation and validation.
//!
//! Two independent signing contexts: access tokens (10 minutes, signed with
//! the access secret) and refresh tokens (no `exp` claim, signed with the
//! refresh secret). A refresh token's lifetime is controlled entirely by the
//! revocation registry.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity snapshot taken at login and carried by both token kinds.
///
/// Not refreshed from storage on each request: changes to the stored user
/// become visible only after the next full login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub name: String,
    pub email: String,
}

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (10 minutes)
    Access,
    /// Refresh token, valid while registered
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub identity: IdentityClaim,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens. No `exp`: the registry decides validity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(flatten)]
    pub identity: IdentityClaim,
    /// Random ID so that two sessions never share a token string
    pub jti: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

/// Access token duration: 10 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 10 * 60;

/// Refresh token cookie lifetime: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Signing keys for both token kinds.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

/// Result of generating an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenResult {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
}

/// Result of generating a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    /// The JWT token string
    pub token: String,
    /// JWT ID
    pub jti: String,
    /// Cookie lifetime in seconds
    pub duration: u64,
}

fn unix_now() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

fn classify(e: jsonwebtoken::errors::Error) -> JwtError {
    match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::InvalidSignature,
    }
}

impl JwtConfig {
    /// Create a new JWT configuration from the access and refresh secrets.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
        }
    }

    /// Generate an access token that expires 10 minutes from now.
    pub fn generate_access_token(
        &self,
        identity: &IdentityClaim,
    ) -> Result<AccessTokenResult, JwtError> {
        self.generate_access_token_at(identity, unix_now()?)
    }

    /// Generate an access token as if issued at `issued_at` (Unix seconds).
    pub fn generate_access_token_at(
        &self,
        identity: &IdentityClaim,
        issued_at: u64,
    ) -> Result<AccessTokenResult, JwtError> {
        let claims = AccessClaims {
            identity: identity.clone(),
            token_type: TokenType::Access,
            iat: issued_at,
            exp: issued_at + ACCESS_TOKEN_DURATION_SECS,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(AccessTokenResult {
            token,
            duration: ACCESS_TOKEN_DURATION_SECS,
        })
    }

    /// Generate a refresh token. It carries no expiry claim.
    pub fn generate_refresh_token(
        &self,
        identity: &IdentityClaim,
    ) -> Result<RefreshTokenResult, JwtError> {
        let jti = uuid::Uuid::new_v4().to_string();

        let claims = RefreshClaims {
            identity: identity.clone(),
            jti: jti.clone(),
            token_type: TokenType::Refresh,
            iat: unix_now()?,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            jti,
            duration: REFRESH_TOKEN_DURATION_SECS,
        })
    }

    /// Validate and decode an access token.
    ///
    /// Distinguishes `Expired` (signature valid, window passed) from
    /// `InvalidSignature` (everything else).
    pub fn validate_access_token(&self, token: &str) -> Result<IdentityClaim, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.access_decoding, &validation)
                .map_err(classify)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(JwtError::InvalidSignature);
        }

        Ok(token_data.claims.identity)
    }

    /// Validate and decode a refresh token. No expiry is checked.
    pub fn validate_refresh_token(&self, token: &str) -> Result<IdentityClaim, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let token_data =
            jsonwebtoken::decode::<RefreshClaims>(token, &self.refresh_decoding, &validation)
                .map_err(|_| JwtError::InvalidSignature)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err(JwtError::InvalidSignature);
        }

        Ok(token_data.claims.identity)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Signature, format or token type is wrong
    InvalidSignature,
    /// Signature is valid but the token's window has passed
    Expired,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::InvalidSignature => write!(f, "Invalid token signature"),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
