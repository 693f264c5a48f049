//! Connection registry: which real-time connection currently speaks for
//! which user.
//!
//! One live handle per user; the last `register` wins. The map sits behind a
//! single lock. Message pushes happen after it is released; presence events
//! are enqueued while it is held, so every connection observes membership
//! changes in the order they were applied. Enqueueing never waits on a
//! client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use chatsync_shared::{ServerEvent, UserId};

use crate::presence::{PresenceBroadcaster, PresenceSnapshot};

/// Process-unique identifier of one real-time connection.
pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Sending side of one client's real-time connection.
///
/// Pushes are fire-and-forget: they enqueue onto the connection's writer
/// task and never wait for the client.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiver the transport's writer drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Enqueue `event`. Returns `false` when the connection is gone.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Shared, lock-guarded `UserId -> ConnectionHandle` map.
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<Mutex<HashMap<UserId, ConnectionHandle>>>,
    presence: PresenceBroadcaster,
}

impl ConnectionRegistry {
    pub fn new(presence: PresenceBroadcaster) -> Self {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            presence,
        }
    }

    /// Make `handle` the user's active connection, replacing any previous one.
    pub fn register(&self, user: UserId, handle: ConnectionHandle) {
        let mut connections = self.connections.lock();
        let replaced = connections.insert(user, handle.clone());

        match &replaced {
            Some(previous) => debug!(
                user = %user,
                connection = handle.id(),
                replaced = previous.id(),
                "connection replaced"
            ),
            None => debug!(user = %user, connection = handle.id(), "connection registered"),
        }

        let snapshot = snapshot_excluding(&connections, user);
        self.presence
            .user_connected(user, replaced.is_none(), &handle, &snapshot);
    }

    /// Remove the user's entry, but only if it still belongs to `connection`.
    ///
    /// A disconnect racing a newer connect for the same user is a no-op.
    /// Transports also call this when they detect a dead connection.
    pub fn unregister(&self, user: UserId, connection: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        match connections.get(&user) {
            Some(current) if current.id() == connection => {
                connections.remove(&user);
                debug!(user = %user, connection, "connection unregistered");
                let snapshot = snapshot_excluding(&connections, user);
                self.presence.user_disconnected(user, &snapshot);
                true
            }
            _ => {
                debug!(user = %user, connection, "stale unregister ignored");
                false
            }
        }
    }

    /// The user's active connection, or `None` if they are unreachable.
    pub fn lookup(&self, user: UserId) -> Option<ConnectionHandle> {
        self.connections.lock().get(&user).cloned()
    }

    /// Push `event` to `user` if connected. A handle whose connection has
    /// closed is dropped from the registry and the user counts as offline.
    pub fn push_to(&self, user: UserId, event: ServerEvent) -> bool {
        let Some(handle) = self.lookup(user) else {
            return false;
        };

        let name = event.name();
        if handle.push(event) {
            return true;
        }

        debug!(user = %user, connection = handle.id(), event = name, "push to closed connection");
        self.unregister(user, handle.id());
        false
    }

    /// Currently registered users, sorted.
    pub fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.connections.lock().keys().copied().collect();
        users.sort();
        users
    }

    /// Drop every handle. Writer tasks observe their channel closing and
    /// shut their sockets.
    pub fn shutdown(&self) {
        let drained = std::mem::take(&mut *self.connections.lock());
        debug!(connections = drained.len(), "registry torn down");
    }
}

fn snapshot_excluding(
    connections: &HashMap<UserId, ConnectionHandle>,
    user: UserId,
) -> PresenceSnapshot {
    let mut online: Vec<UserId> = connections.keys().copied().collect();
    online.sort();
    PresenceSnapshot {
        others: connections
            .iter()
            .filter(|(u, _)| **u != user)
            .map(|(_, h)| h.clone())
            .collect(),
        online,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::PresenceMode;
    use crate::testing::drain;

    fn registry() -> ConnectionRegistry {
        ConnectionRegistry::new(PresenceBroadcaster::new(PresenceMode::Delta))
    }

    #[test]
    fn lookup_absent_user_is_none() {
        let registry = registry();
        assert!(registry.lookup(UserId::new()).is_none());
        assert!(!registry.push_to(
            UserId::new(),
            ServerEvent::OnlineUsers { user_ids: vec![] }
        ));
    }

    #[test]
    fn register_replaces_previous_handle() {
        let registry = registry();
        let user = UserId::new();
        let (first, _rx1) = ConnectionHandle::new();
        let (second, _rx2) = ConnectionHandle::new();

        registry.register(user, first.clone());
        registry.register(user, second.clone());

        assert_eq!(registry.lookup(user).map(|h| h.id()), Some(second.id()));
        assert_eq!(registry.online_users(), vec![user]);
    }

    #[test]
    fn stale_unregister_keeps_newer_connection() {
        let registry = registry();
        let user = UserId::new();
        let (old, _rx1) = ConnectionHandle::new();
        let (new, _rx2) = ConnectionHandle::new();

        registry.register(user, old.clone());
        registry.register(user, new.clone());

        assert!(!registry.unregister(user, old.id()));
        assert!(registry.lookup(user).is_some());

        assert!(registry.unregister(user, new.id()));
        assert!(registry.lookup(user).is_none());
        assert!(registry.lookup(user).is_none());
    }

    #[test]
    fn push_to_closed_connection_unregisters() {
        let registry = registry();
        let user = UserId::new();
        let (handle, rx) = ConnectionHandle::new();
        registry.register(user, handle);
        drop(rx);

        assert!(!registry.push_to(user, ServerEvent::OnlineUsers { user_ids: vec![] }));
        assert!(registry.lookup(user).is_none());
    }

    #[test]
    fn push_to_live_connection_delivers() {
        let registry = registry();
        let user = UserId::new();
        let (handle, mut rx) = ConnectionHandle::new();
        registry.register(user, handle);
        drain(&mut rx);

        let event = ServerEvent::Presence {
            user_id: UserId::new(),
            online: true,
        };
        assert!(registry.push_to(user, event.clone()));
        assert_eq!(drain(&mut rx), vec![event]);
    }

    #[test]
    fn presence_view_converges_under_concurrent_churn() {
        let registry = registry();
        let observer = UserId::new();
        let (observer_handle, mut observer_rx) = ConnectionHandle::new();

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let user = UserId::new();
                    for _ in 0..200 {
                        let (handle, _rx) = ConnectionHandle::new();
                        registry.register(user, handle.clone());
                        registry.unregister(user, handle.id());
                    }
                    // Half the workers stay online at the end.
                    (i % 2 == 0).then(|| {
                        let (handle, rx) = ConnectionHandle::new();
                        registry.register(user, handle);
                        rx
                    })
                })
            })
            .collect();

        registry.register(observer, observer_handle);
        let _kept: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        let mut view = std::collections::BTreeSet::new();
        for event in drain(&mut observer_rx) {
            match event {
                ServerEvent::OnlineUsers { user_ids } => view = user_ids.into_iter().collect(),
                ServerEvent::Presence { user_id, online: true } => {
                    view.insert(user_id);
                }
                ServerEvent::Presence { user_id, online: false } => {
                    view.remove(&user_id);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        let expected: std::collections::BTreeSet<_> = registry.online_users().into_iter().collect();
        assert_eq!(expected.len(), 3);
        assert_eq!(view, expected);
    }

    #[test]
    fn shutdown_closes_receivers() {
        let registry = registry();
        let (handle, mut rx) = ConnectionHandle::new();
        registry.register(UserId::new(), handle);
        drain(&mut rx);

        registry.shutdown();

        assert!(registry.online_users().is_empty());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }
}
