//! Stored credential accessor
//!
//! Holds the bearer token issued at login. Shared between the HTTP client and
//! the realtime client, which sends it in its `auth` frame at connect time.

use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe holder for the current bearer token
///
/// Token issuance and refresh happen elsewhere; this type only stores the
/// latest value.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Replace the stored token
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
        tracing::debug!("Bearer token updated");
    }

    /// Clear the stored token (logout)
    pub fn clear(&self) {
        *self.token.write() = None;
        tracing::debug!("Bearer token cleared");
    }

    /// Get a copy of the current token, if any
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Check whether a token is currently stored
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}
