//! Presence derived from connection churn.
//!
//! There is no heartbeat: a user is online exactly while the registry holds
//! a handle for them. Liveness of the underlying socket is the transport's
//! business; it reports dead connections through
//! [`ConnectionRegistry::unregister`](crate::registry::ConnectionRegistry::unregister).

use std::str::FromStr;

use tracing::debug;

use chatsync_shared::{ServerEvent, UserId};

use crate::registry::ConnectionHandle;

/// How online-set changes are announced to other connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PresenceMode {
    /// `presence{userId, online}` for the one user that changed.
    #[default]
    Delta,
    /// `onlineUsers{userIds}` with the whole set on every change.
    FullSet,
}

impl FromStr for PresenceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delta" => Ok(Self::Delta),
            "full" | "full-set" | "fullset" => Ok(Self::FullSet),
            other => Err(format!("unknown presence mode: {other}")),
        }
    }
}

/// Registry state after one membership change, taken under the registry lock.
#[derive(Debug, Clone)]
pub struct PresenceSnapshot {
    /// Handles of every registered user except the one that changed.
    pub others: Vec<ConnectionHandle>,
    /// Online set after the change, sorted.
    pub online: Vec<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct PresenceBroadcaster {
    mode: PresenceMode,
}

impl PresenceBroadcaster {
    pub fn new(mode: PresenceMode) -> Self {
        Self { mode }
    }

    /// A connection was registered for `user`.
    ///
    /// The new connection always receives the full online set. Others hear
    /// about it only if the user was offline before.
    pub fn user_connected(
        &self,
        user: UserId,
        newly_online: bool,
        handle: &ConnectionHandle,
        snapshot: &PresenceSnapshot,
    ) {
        handle.push(ServerEvent::OnlineUsers {
            user_ids: snapshot.online.clone(),
        });

        if newly_online {
            self.announce(user, true, snapshot);
        }
    }

    /// The user's last connection was unregistered.
    pub fn user_disconnected(&self, user: UserId, snapshot: &PresenceSnapshot) {
        self.announce(user, false, snapshot);
    }

    fn announce(&self, user: UserId, online: bool, snapshot: &PresenceSnapshot) {
        let event = match self.mode {
            PresenceMode::Delta => ServerEvent::Presence {
                user_id: user,
                online,
            },
            PresenceMode::FullSet => ServerEvent::OnlineUsers {
                user_ids: snapshot.online.clone(),
            },
        };

        let delivered = snapshot
            .others
            .iter()
            .filter(|h| h.push(event.clone()))
            .count();

        debug!(
            user = %user,
            online,
            delivered,
            recipients = snapshot.others.len(),
            "presence change broadcast"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConnectionRegistry;
    use crate::testing::{connect, drain};

    #[test]
    fn parse_presence_mode() {
        assert_eq!("delta".parse::<PresenceMode>(), Ok(PresenceMode::Delta));
        assert_eq!("FULL".parse::<PresenceMode>(), Ok(PresenceMode::FullSet));
        assert!("heartbeat".parse::<PresenceMode>().is_err());
    }

    #[test]
    fn newcomer_gets_full_set_and_others_get_delta() {
        let registry = ConnectionRegistry::new(PresenceBroadcaster::new(PresenceMode::Delta));
        let alice = UserId::new();
        let bob = UserId::new();

        let mut alice_rx = connect(&registry, alice);
        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerEvent::OnlineUsers {
                user_ids: vec![alice]
            }]
        );

        let mut bob_rx = connect(&registry, bob);
        let mut both = vec![alice, bob];
        both.sort();
        assert_eq!(
            drain(&mut bob_rx),
            vec![ServerEvent::OnlineUsers { user_ids: both }]
        );
        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerEvent::Presence {
                user_id: bob,
                online: true
            }]
        );
    }

    #[test]
    fn disconnect_is_announced_to_others_only() {
        let registry = ConnectionRegistry::new(PresenceBroadcaster::new(PresenceMode::Delta));
        let alice = UserId::new();
        let bob = UserId::new();

        let mut alice_rx = connect(&registry, alice);
        let (bob_handle, mut bob_rx) = ConnectionHandle::new();
        registry.register(bob, bob_handle.clone());
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        registry.unregister(bob, bob_handle.id());

        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerEvent::Presence {
                user_id: bob,
                online: false
            }]
        );
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[test]
    fn reconnect_does_not_rebroadcast() {
        let registry = ConnectionRegistry::new(PresenceBroadcaster::new(PresenceMode::Delta));
        let alice = UserId::new();
        let bob = UserId::new();

        let mut alice_rx = connect(&registry, alice);
        let _bob_first = connect(&registry, bob);
        drain(&mut alice_rx);

        // Same user, new connection: the online set did not change.
        let _bob_second = connect(&registry, bob);
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[test]
    fn full_set_mode_sends_whole_set() {
        let registry = ConnectionRegistry::new(PresenceBroadcaster::new(PresenceMode::FullSet));
        let alice = UserId::new();
        let bob = UserId::new();

        let mut alice_rx = connect(&registry, alice);
        drain(&mut alice_rx);
        let _bob_rx = connect(&registry, bob);

        let mut both = vec![alice, bob];
        both.sort();
        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerEvent::OnlineUsers { user_ids: both }]
        );
    }
}
