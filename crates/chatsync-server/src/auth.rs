//! Identity service: turns a presented bearer token into a [`UserId`].
//!
//! Tokens are random and only their BLAKE3 digest is persisted, so a leaked
//! database does not leak credentials.

use std::sync::Arc;

use thiserror::Error;

use chatsync_shared::constants::TOKEN_BYTES;
use chatsync_shared::UserId;
use chatsync_store::StoreError;

use crate::store::DurableStore;

#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid bearer token")]
    InvalidToken,

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

pub trait IdentityService: Send + Sync {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthFailure>;
}

/// Resolves tokens against the users table of the durable store.
pub struct TokenIdentity {
    store: Arc<dyn DurableStore>,
}

impl TokenIdentity {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store }
    }
}

impl IdentityService for TokenIdentity {
    fn authenticate(&self, token: &str) -> Result<UserId, AuthFailure> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthFailure::MissingToken);
        }

        self.store
            .find_user_by_token_hash(&hash_token(token))?
            .ok_or(AuthFailure::InvalidToken)
    }
}

/// Generate a fresh token. Returns `(token, digest)`; only the digest is
/// meant to be stored.
pub fn issue_token() -> (String, String) {
    let bytes: [u8; TOKEN_BYTES] = rand::random();
    let token = hex::encode(bytes);
    let digest = hash_token(&token);
    (token, digest)
}

pub fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}
