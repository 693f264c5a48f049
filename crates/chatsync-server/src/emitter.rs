//! Pushes for contact and conversation lifecycle events.
//!
//! Callers persist first and emit after; an emit never touches the store and
//! never fails. Recipients who are offline pick the change up on their next
//! list refresh.

use tracing::debug;

use chatsync_shared::{Conversation, ServerEvent, UserId, UserSummary};

use crate::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct ContactEventEmitter {
    registry: ConnectionRegistry,
}

impl ContactEventEmitter {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// `requester` added `contact`. The contact learns who added them and
    /// both sides receive the direct conversation, if one was created.
    pub fn contact_added(
        &self,
        requester: &UserSummary,
        contact: UserId,
        conversation: Option<&Conversation>,
    ) {
        let delivered = self.registry.push_to(
            contact,
            ServerEvent::NewContactAdded {
                user_summary: requester.clone(),
            },
        );
        debug!(requester = %requester.id, contact = %contact, delivered, "contact added");

        if let Some(conversation) = conversation {
            self.conversation_created(conversation);
        }
    }

    /// Push `newConversation` to every participant, the creator included.
    /// Returns how many participants were reached.
    pub fn conversation_created(&self, conversation: &Conversation) -> usize {
        let delivered = conversation
            .participant_ids()
            .filter(|participant| {
                self.registry.push_to(
                    *participant,
                    ServerEvent::NewConversation {
                        conversation: conversation.clone(),
                    },
                )
            })
            .count();

        debug!(
            conversation = %conversation.id,
            participants = conversation.participants.len(),
            delivered,
            "conversation created"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{PresenceBroadcaster, PresenceMode};
    use crate::store::DurableStore;
    use crate::testing::{connect, drain_non_presence, store, user};
    use chatsync_store::NewConversation;

    #[test]
    fn contact_added_notifies_contact_and_both_sides_of_conversation() {
        let store = store();
        let registry = ConnectionRegistry::new(PresenceBroadcaster::new(PresenceMode::Delta));
        let emitter = ContactEventEmitter::new(registry.clone());

        let alice = user(&store, "alice");
        let bob = user(&store, "bob");
        let conv = store
            .create_conversation(&NewConversation::direct(alice.id, bob.id))
            .unwrap();

        let mut alice_rx = connect(&registry, alice.id);
        let mut bob_rx = connect(&registry, bob.id);

        emitter.contact_added(&alice, bob.id, Some(&conv));

        let to_bob = drain_non_presence(&mut bob_rx);
        assert_eq!(
            to_bob,
            vec![
                ServerEvent::NewContactAdded {
                    user_summary: alice.clone()
                },
                ServerEvent::NewConversation {
                    conversation: conv.clone()
                },
            ]
        );

        let to_alice = drain_non_presence(&mut alice_rx);
        assert_eq!(
            to_alice,
            vec![ServerEvent::NewConversation { conversation: conv }]
        );
    }

    #[test]
    fn conversation_created_counts_online_participants() {
        let store = store();
        let registry = ConnectionRegistry::new(PresenceBroadcaster::new(PresenceMode::Delta));
        let emitter = ContactEventEmitter::new(registry.clone());

        let a = user(&store, "a");
        let b = user(&store, "b");
        let c = user(&store, "c");
        let conv = store
            .create_conversation(&NewConversation::group("trip", a.id, vec![a.id, b.id, c.id]))
            .unwrap();

        let _a_rx = connect(&registry, a.id);
        let _c_rx = connect(&registry, c.id);

        assert_eq!(emitter.conversation_created(&conv), 2);
    }
}
