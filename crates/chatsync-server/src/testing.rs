//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use tokio::sync::mpsc;

use chatsync_shared::{ServerEvent, UserId, UserSummary};
use chatsync_store::{Database, NewUser};

use crate::auth::hash_token;
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::store::SqliteStore;

pub fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::new(
        Database::open_in_memory().expect("in-memory database"),
    ))
}

/// Create a user whose bearer token is `token-<username>`.
pub fn user(store: &SqliteStore, username: &str) -> UserSummary {
    store
        .with_db(|db| {
            db.create_user(&NewUser {
                username: username.to_string(),
                full_name: format!("{username} full"),
                bio: String::new(),
                profile_pic: None,
                token_hash: hash_token(&format!("token-{username}")),
            })
        })
        .expect("create user")
}

pub fn connect(registry: &ConnectionRegistry, user: UserId) -> mpsc::UnboundedReceiver<ServerEvent> {
    let (handle, rx) = ConnectionHandle::new();
    registry.register(user, handle);
    rx
}

/// Everything queued on `rx` right now.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Queued events without the presence traffic.
pub fn drain_non_presence(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    drain(rx)
        .into_iter()
        .filter(|e| {
            !matches!(
                e,
                ServerEvent::Presence { .. } | ServerEvent::OnlineUsers { .. }
            )
        })
        .collect()
}
