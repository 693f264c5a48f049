//! Contact-add and group-create flows.
//!
//! Both persist first and hand the result to the [`ContactEventEmitter`];
//! nothing is pushed for a request that failed validation or storage.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use chatsync_shared::{Conversation, UserId, UserSummary, ValidationError};
use chatsync_store::{NewConversation, StoreError};

use crate::emitter::ContactEventEmitter;
use crate::error::ServerError;
use crate::store::DurableStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactAdded {
    pub contact: UserSummary,
    pub conversation: Conversation,
}

#[derive(Clone)]
pub struct ContactService {
    store: Arc<dyn DurableStore>,
    emitter: ContactEventEmitter,
}

impl ContactService {
    pub fn new(store: Arc<dyn DurableStore>, emitter: ContactEventEmitter) -> Self {
        Self { store, emitter }
    }

    /// Add the user named `username` to `me`'s contacts, reusing or creating
    /// the one-to-one conversation between them.
    pub fn add_contact(&self, me: UserId, username: &str) -> Result<ContactAdded, ServerError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::MissingField("username").into());
        }

        let contact = self
            .store
            .find_user_by_username(username)?
            .ok_or_else(|| ServerError::NotFound(format!("user {username}")))?;

        if contact.id == me {
            return Err(ValidationError::SelfContact.into());
        }
        if self.store.is_contact(me, contact.id)? {
            return Err(ValidationError::AlreadyContact.into());
        }

        let requester = self.store.get_user(me)?;
        self.store.add_contact(me, contact.id)?;

        let conversation = match self.store.find_direct_conversation(me, contact.id)? {
            Some(existing) => existing,
            None => self
                .store
                .create_conversation(&NewConversation::direct(me, contact.id))?,
        };

        info!(
            user = %me,
            contact = %contact.id,
            conversation = %conversation.id,
            "Contact added"
        );

        self.emitter
            .contact_added(&requester, contact.id, Some(&conversation));

        Ok(ContactAdded {
            contact,
            conversation,
        })
    }

    /// Create a group administered by `me`. The creator is always a
    /// participant; repeated ids are collapsed.
    pub fn create_group(
        &self,
        me: UserId,
        name: &str,
        participants: &[UserId],
    ) -> Result<Conversation, ServerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        if participants.is_empty() {
            return Err(ValidationError::MissingField("participants").into());
        }

        let mut members = Vec::with_capacity(participants.len() + 1);
        for id in participants.iter().copied().chain(std::iter::once(me)) {
            if members.contains(&id) {
                continue;
            }
            match self.store.get_user(id) {
                Ok(_) => members.push(id),
                Err(StoreError::NotFound) => {
                    return Err(ServerError::NotFound(format!("user {id}")))
                }
                Err(e) => return Err(e.into()),
            }
        }

        let conversation = self
            .store
            .create_conversation(&NewConversation::group(name, me, members))?;

        let delivered = self.emitter.conversation_created(&conversation);
        info!(
            admin = %me,
            conversation = %conversation.id,
            participants = conversation.participants.len(),
            delivered,
            "Group created"
        );

        Ok(conversation)
    }
}
