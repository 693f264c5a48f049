//! Fixtures shared by the unit tests of this crate.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use chatsync_shared::{
    Conversation, ConversationId, Message, MessageContent, MessageId, UserId, UserSummary,
};

use crate::backend::ChatBackend;
use crate::error::{ClientError, Result};
use crate::events::SessionListener;

pub fn user(full_name: &str) -> UserSummary {
    UserSummary {
        id: UserId::new(),
        username: full_name.to_lowercase().replace(' ', "."),
        full_name: full_name.to_string(),
        profile_pic: None,
        bio: String::new(),
    }
}

/// A one-to-one conversation when given two users, otherwise an unnamed
/// group.
pub fn conversation(participants: &[&UserSummary]) -> Conversation {
    Conversation {
        id: ConversationId::new(),
        is_group: participants.len() > 2,
        participants: participants.iter().map(|u| (*u).clone()).collect(),
        group_name: None,
        group_icon: None,
        group_admin: None,
        last_message: None,
        created_at: Utc::now(),
    }
}

pub fn message(conversation: ConversationId, seq: u64, sender: &UserSummary, text: &str) -> Message {
    Message {
        id: MessageId::new(),
        conversation_id: conversation,
        seq,
        sender_id: sender.id,
        sender_name: sender.full_name.clone(),
        sender_avatar: None,
        text: Some(text.to_string()),
        media_ref: None,
        created_at: Utc::now(),
        seen_by: BTreeSet::from([sender.id]),
    }
}

#[derive(Default)]
struct FakeState {
    me: Option<UserSummary>,
    conversations: Vec<Conversation>,
    messages: HashMap<ConversationId, Vec<Message>>,
    contacts: Vec<UserSummary>,
    conversation_fetches: usize,
    fail_sends: bool,
    fail_conversation_fetches: bool,
}

/// In-memory [`ChatBackend`]. Clones share state so a test can reshape the
/// "server" while a session holds the backend.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    pub fn set_me(&self, me: UserSummary) {
        self.state.lock().unwrap().me = Some(me);
    }

    pub fn set_conversations(&self, conversations: Vec<Conversation>) {
        self.state.lock().unwrap().conversations = conversations;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.lock().unwrap().fail_sends = fail;
    }

    pub fn fail_conversation_fetches(&self, fail: bool) {
        self.state.lock().unwrap().fail_conversation_fetches = fail;
    }

    pub fn conversation_fetches(&self) -> usize {
        self.state.lock().unwrap().conversation_fetches
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn fetch_me(&self) -> Result<UserSummary> {
        let state = self.state.lock().unwrap();
        state.me.clone().ok_or(ClientError::Status {
            status: 401,
            message: "Not authorized".into(),
        })
    }

    async fn fetch_conversations(&self) -> Result<Vec<Conversation>> {
        let mut state = self.state.lock().unwrap();
        state.conversation_fetches += 1;
        if state.fail_conversation_fetches {
            return Err(ClientError::Status {
                status: 500,
                message: "Internal server error".into(),
            });
        }
        Ok(state.conversations.clone())
    }

    async fn fetch_messages(&self, conversation: ConversationId) -> Result<Vec<Message>> {
        let state = self.state.lock().unwrap();
        Ok(state.messages.get(&conversation).cloned().unwrap_or_default())
    }

    async fn send_message(
        &self,
        conversation: ConversationId,
        content: &MessageContent,
    ) -> Result<Message> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends {
            return Err(ClientError::Status {
                status: 500,
                message: "Internal server error".into(),
            });
        }
        let sender = state.me.clone().unwrap_or_else(|| user("Sender"));
        let history = state.messages.entry(conversation).or_default();
        let mut sent = message(
            conversation,
            history.len() as u64 + 1,
            &sender,
            content.text.as_deref().unwrap_or_default(),
        );
        sent.text = content.text.clone();
        sent.media_ref = content.media_ref.clone();
        history.push(sent.clone());
        Ok(sent)
    }

    async fn fetch_contacts(&self) -> Result<Vec<UserSummary>> {
        Ok(self.state.lock().unwrap().contacts.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Conversations(Vec<ConversationId>),
    Messages(usize),
    Presence(UserId, bool),
    Unseen(ConversationId, u32),
    Contact(UserId),
}

/// Listener that records every notification in order.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Notification>,
}

impl SessionListener for Recorder {
    fn on_conversations_changed(&mut self, conversations: &[Conversation]) {
        self.events.push(Notification::Conversations(
            conversations.iter().map(|c| c.id).collect(),
        ));
    }

    fn on_messages_changed(&mut self, messages: &[Message]) {
        self.events.push(Notification::Messages(messages.len()));
    }

    fn on_presence_changed(&mut self, user: UserId, online: bool) {
        self.events.push(Notification::Presence(user, online));
    }

    fn on_unseen_count_changed(&mut self, conversation: ConversationId, count: u32) {
        self.events.push(Notification::Unseen(conversation, count));
    }

    fn on_contact_added(&mut self, contact: &UserSummary) {
        self.events.push(Notification::Contact(contact.id));
    }
}
