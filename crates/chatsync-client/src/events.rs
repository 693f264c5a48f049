//! Notifications the session hands to the UI layer.

use tracing::info;

use chatsync_shared::{Conversation, ConversationId, Message, UserId, UserSummary};

/// Push-style callbacks for whatever renders session state. Every method
/// has a no-op default so listeners implement only what they display.
pub trait SessionListener: Send {
    fn on_conversations_changed(&mut self, _conversations: &[Conversation]) {}
    fn on_messages_changed(&mut self, _messages: &[Message]) {}
    fn on_presence_changed(&mut self, _user: UserId, _online: bool) {}
    fn on_unseen_count_changed(&mut self, _conversation: ConversationId, _count: u32) {}
    fn on_contact_added(&mut self, _contact: &UserSummary) {}
}

/// Listener that writes every notification to the log.
#[derive(Debug, Default)]
pub struct LogListener;

impl SessionListener for LogListener {
    fn on_conversations_changed(&mut self, conversations: &[Conversation]) {
        let front = conversations.first().map(|c| c.id.to_string());
        info!(count = conversations.len(), front = ?front, "conversations changed");
    }

    fn on_messages_changed(&mut self, messages: &[Message]) {
        if let Some(last) = messages.last() {
            info!(
                count = messages.len(),
                from = %last.sender_name,
                text = last.text.as_deref().unwrap_or("<media>"),
                "messages changed"
            );
        }
    }

    fn on_presence_changed(&mut self, user: UserId, online: bool) {
        info!(user = %user.short(), online, "presence changed");
    }

    fn on_unseen_count_changed(&mut self, conversation: ConversationId, count: u32) {
        info!(conversation = %conversation, count, "unseen count changed");
    }

    fn on_contact_added(&mut self, contact: &UserSummary) {
        info!(username = %contact.username, "contact added");
    }
}
