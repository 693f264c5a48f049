//! Client-side reconciliation of pushed events into local state.
//!
//! A session is driven by a single task: every method takes `&mut self`, so
//! two events can never interleave mid-reconciliation.

use tracing::{debug, info, warn};

use chatsync_shared::{
    Conversation, ConversationId, Message, MessageContent, ServerEvent, UserId, UserSummary,
};

use crate::backend::ChatBackend;
use crate::contacts::ContactList;
use crate::conversations::{ApplyOutcome, ConversationStore};
use crate::error::{ClientError, Result};
use crate::events::SessionListener;
use crate::messages::MessageStream;
use crate::presence::OnlineSet;
use crate::unseen::UnseenCounter;

pub struct ChatSession<B, L> {
    me: UserId,
    backend: B,
    listener: L,
    conversations: ConversationStore,
    stream: MessageStream,
    unseen: UnseenCounter,
    contacts: ContactList,
    online: OnlineSet,
}

impl<B: ChatBackend, L: SessionListener> ChatSession<B, L> {
    pub fn new(me: UserId, backend: B, listener: L) -> Self {
        Self {
            me,
            backend,
            listener,
            conversations: ConversationStore::new(),
            stream: MessageStream::new(),
            unseen: UnseenCounter::new(),
            contacts: ContactList::new(),
            online: OnlineSet::new(),
        }
    }

    // ------------------------------------------------------------------
    // Pull operations
    // ------------------------------------------------------------------

    /// Replace the conversation list with the store's current view.
    pub async fn refresh_conversations(&mut self) -> Result<()> {
        let fetched = self.backend.fetch_conversations().await?;
        self.conversations.replace_all(fetched);
        self.listener
            .on_conversations_changed(self.conversations.list());
        Ok(())
    }

    pub async fn refresh_contacts(&mut self) -> Result<()> {
        let fetched = self.backend.fetch_contacts().await?;
        self.contacts.replace_all(fetched);
        Ok(())
    }

    /// Load the full history of `id`, make it the open conversation and
    /// zero its unseen count. On failure nothing changes.
    pub async fn open_conversation(&mut self, id: ConversationId) -> Result<()> {
        let history = self.backend.fetch_messages(id).await?;
        self.stream.open(id, history);
        self.listener.on_messages_changed(self.stream.messages());

        if self.unseen.reset(id) {
            self.listener.on_unseen_count_changed(id, 0);
        }
        debug!(conversation = %id, messages = self.stream.messages().len(), "conversation opened");
        Ok(())
    }

    pub fn close_conversation(&mut self) {
        self.stream.close();
        self.listener.on_messages_changed(self.stream.messages());
    }

    /// Send into the open conversation. The persisted message is appended
    /// locally since the sender never receives its own push. Errors are
    /// returned untouched so the caller can mark the message failed.
    pub async fn send(&mut self, content: MessageContent) -> Result<Message> {
        let id = self
            .stream
            .open_conversation()
            .ok_or(ClientError::NoOpenConversation)?;

        let message = match self.backend.send_message(id, &content).await {
            Ok(message) => message,
            Err(e) => {
                warn!(conversation = %id, error = %e, "Send failed");
                return Err(e);
            }
        };

        if self.stream.append(message.clone()) {
            self.listener.on_messages_changed(self.stream.messages());
        }
        if self.conversations.apply_message(&message) == ApplyOutcome::Moved {
            self.listener
                .on_conversations_changed(self.conversations.list());
        }
        Ok(message)
    }

    // ------------------------------------------------------------------
    // Push reconciliation
    // ------------------------------------------------------------------

    /// Route one pushed event.
    pub async fn handle_event(&mut self, event: ServerEvent) -> Result<()> {
        match event {
            ServerEvent::NewMessage { message } => self.on_incoming_message(message).await,
            ServerEvent::NewConversation { conversation } => {
                self.on_conversation_created(conversation);
                Ok(())
            }
            ServerEvent::NewContactAdded { user_summary } => {
                self.on_contact_added(user_summary);
                Ok(())
            }
            ServerEvent::Presence { user_id, online } => {
                self.on_presence(user_id, online);
                Ok(())
            }
            ServerEvent::OnlineUsers { user_ids } => {
                self.on_online_users(user_ids);
                Ok(())
            }
        }
    }

    /// Reconcile a pushed message. The conversation is resolved first, with
    /// at most one refresh; counters and the open stream only change once it
    /// is known, so a failed refresh leaves the session as it was.
    pub async fn on_incoming_message(&mut self, message: Message) -> Result<()> {
        let id = message.conversation_id;

        let outcome = match self.conversations.apply_message(&message) {
            ApplyOutcome::Unknown => {
                debug!(conversation = %id, "message for unknown conversation, refreshing");
                self.refresh_conversations().await?;
                self.conversations.apply_message(&message)
            }
            known => known,
        };

        match outcome {
            ApplyOutcome::Moved => {
                self.listener
                    .on_conversations_changed(self.conversations.list());
            }
            ApplyOutcome::Stale => {
                debug!(conversation = %id, seq = message.seq, "stale message, list unchanged");
            }
            ApplyOutcome::Unknown => {
                info!(conversation = %id, "conversation not visible, message dropped");
                if self.unseen.reset(id) {
                    self.listener.on_unseen_count_changed(id, 0);
                }
                return Ok(());
            }
        }

        if self.stream.is_open(id) {
            if self.stream.append(message) {
                self.listener.on_messages_changed(self.stream.messages());
            }
        } else {
            let count = self.unseen.increment(id);
            self.listener.on_unseen_count_changed(id, count);
        }
        Ok(())
    }

    /// Insert at the front. Repeated delivery of the same conversation is
    /// ignored.
    pub fn on_conversation_created(&mut self, conversation: Conversation) {
        let id = conversation.id;
        if self.conversations.insert_front(conversation) {
            self.listener
                .on_conversations_changed(self.conversations.list());
        } else {
            debug!(conversation = %id, "duplicate conversation ignored");
        }
    }

    pub fn on_contact_added(&mut self, contact: UserSummary) {
        if self.contacts.add(contact.clone()) {
            self.listener.on_contact_added(&contact);
        }
    }

    pub fn on_presence(&mut self, user: UserId, online: bool) {
        if self.online.apply_delta(user, online) {
            self.listener.on_presence_changed(user, online);
        }
    }

    pub fn on_online_users(&mut self, users: Vec<UserId>) {
        for (user, online) in self.online.apply_full(users) {
            self.listener.on_presence_changed(user, online);
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn me(&self) -> UserId {
        self.me
    }

    pub fn conversations(&self) -> &[Conversation] {
        self.conversations.list()
    }

    /// Conversations whose displayed name contains `query`.
    pub fn search(&self, query: &str) -> Vec<&Conversation> {
        self.conversations.search(query, self.me)
    }

    pub fn open_conversation_id(&self) -> Option<ConversationId> {
        self.stream.open_conversation()
    }

    pub fn messages(&self) -> &[Message] {
        self.stream.messages()
    }

    pub fn unseen_count(&self, conversation: ConversationId) -> u32 {
        self.unseen.get(conversation)
    }

    pub fn total_unseen(&self) -> u32 {
        self.unseen.total()
    }

    pub fn contacts(&self) -> &[UserSummary] {
        self.contacts.list()
    }

    pub fn is_online(&self, user: UserId) -> bool {
        self.online.is_online(user)
    }

    pub fn online_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.online.users()
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }
}
