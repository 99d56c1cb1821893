//! Credential checking collaborator.
//!
//! The authentication core only needs "does this email/password pair belong
//! to someone, and who". Storage and hashing sit behind [`CredentialCheck`].

use std::collections::HashMap;
use std::sync::RwLock;

use futures::future::BoxFuture;
use openssl::hash::MessageDigest;
use serde::Deserialize;

use crate::jwt::IdentityClaim;

const PBKDF2_ITERATIONS: usize = 100_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Errors from a credential check.
#[derive(Debug)]
pub enum CredentialError {
    /// Unknown user or wrong password. The two are indistinguishable.
    InvalidCredentials,
    /// The backing store failed
    Backend(String),
}

impl std::fmt::Display for CredentialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialError::InvalidCredentials => write!(f, "Invalid credentials"),
            CredentialError::Backend(e) => write!(f, "Credential backend error: {}", e),
        }
    }
}

impl std::error::Error for CredentialError {}

/// Verifies a presented email/password pair and returns the identity snapshot.
pub trait CredentialCheck: Send + Sync {
    fn check_credentials<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<IdentityClaim, CredentialError>>;
}

#[derive(Clone)]
struct StoredUser {
    name: String,
    salt: [u8; SALT_LEN],
    hash: [u8; HASH_LEN],
}

/// Users kept in process memory with PBKDF2-HMAC-SHA256 password hashes.
#[derive(Default)]
pub struct MemoryCredentials {
    users: RwLock<HashMap<String, StoredUser>>,
}

/// Entry of a users file: `[{"name": ..., "email": ..., "password": ...}]`.
#[derive(Debug, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub email: String,
    pub password: String,
}

fn hash_password(password: &str, salt: &[u8]) -> Result<[u8; HASH_LEN], CredentialError> {
    let mut hash = [0u8; HASH_LEN];
    openssl::pkcs5::pbkdf2_hmac(
        password.as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        MessageDigest::sha256(),
        &mut hash,
    )
    .map_err(|e| CredentialError::Backend(e.to_string()))?;
    Ok(hash)
}

impl MemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a parsed users file.
    pub fn from_entries(entries: Vec<UserEntry>) -> Result<Self, CredentialError> {
        let credentials = Self::new();
        for entry in entries {
            credentials.add_user(&entry.name, &entry.email, &entry.password)?;
        }
        Ok(credentials)
    }

    /// Add or replace a user. Emails are matched case-insensitively.
    pub fn add_user(&self, name: &str, email: &str, password: &str) -> Result<(), CredentialError> {
        let salt: [u8; SALT_LEN] = rand::random();
        let hash = hash_password(password, &salt)?;

        self.users
            .write()
            .map_err(|_| CredentialError::Backend("user table lock poisoned".into()))?
            .insert(
                email.to_lowercase(),
                StoredUser {
                    name: name.to_string(),
                    salt,
                    hash,
                },
            );
        Ok(())
    }

    /// Update a stored user's display name. Existing sessions keep the old one.
    pub fn rename_user(&self, email: &str, name: &str) -> bool {
        match self.users.write() {
            Ok(mut users) => match users.get_mut(&email.to_lowercase()) {
                Some(user) => {
                    user.name = name.to_string();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    fn lookup(&self, key: &str) -> Result<StoredUser, CredentialError> {
        let users = self
            .users
            .read()
            .map_err(|_| CredentialError::Backend("user table lock poisoned".into()))?;
        users
            .get(key)
            .cloned()
            .ok_or(CredentialError::InvalidCredentials)
    }
}

fn verify_password(password: &str, user: &StoredUser) -> Result<(), CredentialError> {
    let actual = hash_password(password, &user.salt)?;
    if !openssl::memcmp::eq(&actual, &user.hash) {
        return Err(CredentialError::InvalidCredentials);
    }
    Ok(())
}

impl CredentialCheck for MemoryCredentials {
    fn check_credentials<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<IdentityClaim, CredentialError>> {
        Box::pin(async move {
            let key = email.to_lowercase();
            let user = self.lookup(&key)?;
            let name = user.name.clone();

            // PBKDF2 is CPU-bound; keep it off the async workers
            let password = password.to_string();
            tokio::task::spawn_blocking(move || verify_password(&password, &user))
                .await
                .map_err(|e| CredentialError::Backend(e.to_string()))??;

            Ok(IdentityClaim { name, email: key })
        })
    }
}
