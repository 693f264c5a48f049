//! The durable store as seen by the real-time core.
//!
//! Each call is a single-document operation with its own atomicity; nothing
//! here spans documents. Timeouts and retries belong to the implementation,
//! not to callers.

use chatsync_shared::{
    Conversation, ConversationId, Message, MessageContent, MessageId, UserId, UserSummary,
};
use chatsync_store::{Database, NewConversation, NewUser, StoreError};
use parking_lot::Mutex;

pub type StoreResult<T> = Result<T, StoreError>;

pub trait DurableStore: Send + Sync {
    // -- users & contacts --
    fn create_user(&self, user: &NewUser) -> StoreResult<UserSummary>;
    fn get_user(&self, id: UserId) -> StoreResult<UserSummary>;
    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserSummary>>;
    fn find_user_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<UserId>>;
    fn add_contact(&self, a: UserId, b: UserId) -> StoreResult<bool>;
    fn is_contact(&self, owner: UserId, contact: UserId) -> StoreResult<bool>;
    fn list_contacts(&self, owner: UserId) -> StoreResult<Vec<UserSummary>>;

    // -- conversations --
    fn create_conversation(&self, new: &NewConversation) -> StoreResult<Conversation>;
    fn get_conversation(&self, id: ConversationId) -> StoreResult<Conversation>;
    fn find_direct_conversation(&self, a: UserId, b: UserId)
        -> StoreResult<Option<Conversation>>;
    /// Ordered by recency of last activity, most recent first.
    fn find_conversations_by_participant(&self, user: UserId) -> StoreResult<Vec<Conversation>>;
    fn update_conversation_summary(
        &self,
        id: ConversationId,
        message: MessageId,
    ) -> StoreResult<()>;

    // -- messages --
    fn create_message(
        &self,
        conversation: ConversationId,
        sender: UserId,
        content: &MessageContent,
    ) -> StoreResult<Message>;
    /// Ascending creation order.
    fn find_messages_by_conversation(&self, id: ConversationId) -> StoreResult<Vec<Message>>;
    fn mark_seen(&self, conversation: ConversationId, user: UserId) -> StoreResult<usize>;
}

/// [`DurableStore`] over a single SQLite connection.
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Run `f` against the underlying database.
    pub fn with_db<R>(&self, f: impl FnOnce(&Database) -> R) -> R {
        f(&self.db.lock())
    }
}

impl DurableStore for SqliteStore {
    fn create_user(&self, user: &NewUser) -> StoreResult<UserSummary> {
        self.with_db(|db| db.create_user(user))
    }

    fn get_user(&self, id: UserId) -> StoreResult<UserSummary> {
        self.with_db(|db| db.get_user(id))
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<UserSummary>> {
        self.with_db(|db| db.find_user_by_username(username))
    }

    fn find_user_by_token_hash(&self, token_hash: &str) -> StoreResult<Option<UserId>> {
        self.with_db(|db| db.find_user_by_token_hash(token_hash))
    }

    fn add_contact(&self, a: UserId, b: UserId) -> StoreResult<bool> {
        self.with_db(|db| db.add_contact(a, b))
    }

    fn is_contact(&self, owner: UserId, contact: UserId) -> StoreResult<bool> {
        self.with_db(|db| db.is_contact(owner, contact))
    }

    fn list_contacts(&self, owner: UserId) -> StoreResult<Vec<UserSummary>> {
        self.with_db(|db| db.list_contacts(owner))
    }

    fn create_conversation(&self, new: &NewConversation) -> StoreResult<Conversation> {
        self.with_db(|db| db.create_conversation(new))
    }

    fn get_conversation(&self, id: ConversationId) -> StoreResult<Conversation> {
        self.with_db(|db| db.get_conversation(id))
    }

    fn find_direct_conversation(
        &self,
        a: UserId,
        b: UserId,
    ) -> StoreResult<Option<Conversation>> {
        self.with_db(|db| db.find_direct_conversation(a, b))
    }

    fn find_conversations_by_participant(&self, user: UserId) -> StoreResult<Vec<Conversation>> {
        self.with_db(|db| db.find_conversations_by_participant(user))
    }

    fn update_conversation_summary(
        &self,
        id: ConversationId,
        message: MessageId,
    ) -> StoreResult<()> {
        self.with_db(|db| db.update_conversation_summary(id, message))
    }

    fn create_message(
        &self,
        conversation: ConversationId,
        sender: UserId,
        content: &MessageContent,
    ) -> StoreResult<Message> {
        self.with_db(|db| db.create_message(conversation, sender, content))
    }

    fn find_messages_by_conversation(&self, id: ConversationId) -> StoreResult<Vec<Message>> {
        self.with_db(|db| db.find_messages_by_conversation(id))
    }

    fn mark_seen(&self, conversation: ConversationId, user: UserId) -> StoreResult<usize> {
        self.with_db(|db| db.mark_seen(conversation, user))
    }
}
