//! Registry of refresh tokens that may still be exchanged.
//!
//! Membership is the single source of truth for refresh-token validity: a
//! token that verifies but is not registered is treated as revoked.

use std::collections::HashSet;
use std::sync::RwLock;

/// Store of currently valid refresh-token strings.
///
/// Implementations synchronize internally; callers never lock.
pub trait RevocationRegistry: Send + Sync {
    /// Register a freshly minted refresh token.
    fn add(&self, token: &str);
    /// Revoke a token. Returns whether it was present.
    fn remove(&self, token: &str) -> bool;
    /// Whether the token is still registered.
    fn contains(&self, token: &str) -> bool;
    /// Number of registered tokens.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local registry. Entries live until logout or process exit.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    tokens: RwLock<HashSet<String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

// A poisoned lock only means another request panicked mid-operation; the set
// itself is still consistent since every operation is a single call.
impl RevocationRegistry for MemoryRegistry {
    fn add(&self, token: &str) {
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string());
    }

    fn remove(&self, token: &str) -> bool {
        self.tokens
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(token)
    }

    fn contains(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(token)
    }

    fn len(&self) -> usize {
        self.tokens.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
