//! Message fan-out: persist a message, move the conversation's summary
//! pointer, then push the message to every other participant that is
//! currently connected.
//!
//! Pushes are fire-and-forget. A participant whose push fails counts as
//! offline for that message; the durable store stays authoritative and the
//! client reconciles on its next refresh.
//!
//! Sends into one conversation are serialized from insert through push, so
//! every participant receives that conversation's messages in `seq` order.
//! Calls block on the store and belong on a blocking thread.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use chatsync_shared::{
    ConversationId, Message, MessageContent, ServerEvent, UserId, ValidationError,
};
use chatsync_store::StoreError;

use crate::error::ServerError;
use crate::registry::ConnectionRegistry;
use crate::store::DurableStore;

/// Number of striped locks ordering sends per conversation.
const ORDERING_LANES: usize = 64;

#[derive(Clone)]
pub struct MessageFanout {
    store: Arc<dyn DurableStore>,
    registry: ConnectionRegistry,
    lanes: Arc<[Mutex<()>]>,
}

impl MessageFanout {
    pub fn new(store: Arc<dyn DurableStore>, registry: ConnectionRegistry) -> Self {
        Self {
            store,
            registry,
            lanes: (0..ORDERING_LANES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lane(&self, conversation: ConversationId) -> &Mutex<()> {
        &self.lanes[(conversation.0.as_u128() % ORDERING_LANES as u128) as usize]
    }

    /// Send `content` from `sender` into `conversation_id`.
    ///
    /// Validation failures happen before any write. Returns the persisted
    /// message so the sender can append it locally; the sender never
    /// receives its own push.
    pub fn send(
        &self,
        conversation_id: ConversationId,
        sender: UserId,
        content: MessageContent,
    ) -> Result<Message, ServerError> {
        let content = content.validate()?;

        let conversation = match self.store.get_conversation(conversation_id) {
            Ok(conversation) => conversation,
            Err(StoreError::NotFound) => {
                return Err(ValidationError::UnknownConversation(conversation_id).into())
            }
            Err(e) => return Err(e.into()),
        };

        if !conversation.has_participant(sender) {
            return Err(ValidationError::NotAParticipant {
                user: sender,
                conversation: conversation_id,
            }
            .into());
        }

        let _ordered = self.lane(conversation_id).lock();

        let message = self
            .store
            .create_message(conversation_id, sender, &content)?;

        if let Err(e) = self
            .store
            .update_conversation_summary(conversation_id, message.id)
        {
            // The message is durable; the summary stays stale until the
            // next read-through.
            warn!(
                conversation = %conversation_id,
                message = %message.id,
                error = %e,
                "Failed to update conversation summary"
            );
            return Err(e.into());
        }

        let mut delivered = 0;
        let mut offline = 0;
        for participant in conversation.participant_ids().filter(|p| *p != sender) {
            let event = ServerEvent::NewMessage {
                message: message.clone(),
            };
            if self.registry.push_to(participant, event) {
                delivered += 1;
            } else {
                offline += 1;
                debug!(user = %participant, message = %message.id, "participant offline, skipped");
            }
        }

        info!(
            conversation = %conversation_id,
            message = %message.id,
            seq = message.seq,
            delivered,
            offline,
            "Message fanned out"
        );

        Ok(message)
    }
}
