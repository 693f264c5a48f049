//! Ordered conversation list, most recently active first.
//!
//! The list never holds two entries with the same id. Incoming messages move
//! their conversation to the front; a message older than the one already
//! summarised leaves the list untouched.

use chatsync_shared::{Conversation, ConversationId, Message, MessageSummary, UserId};

/// What [`ConversationStore::apply_message`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Summary replaced and the entry moved to the front.
    Moved,
    /// The entry already summarises this message or a later one.
    Stale,
    /// No entry with that conversation id.
    Unknown,
}

#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    entries: Vec<Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a freshly fetched list. The server's order is
    /// kept; repeated ids after the first are dropped.
    pub fn replace_all(&mut self, conversations: Vec<Conversation>) {
        self.entries.clear();
        for conversation in conversations {
            if !self.contains(conversation.id) {
                self.entries.push(conversation);
            }
        }
    }

    pub fn list(&self) -> &[Conversation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: ConversationId) -> bool {
        self.position(id).is_some()
    }

    fn position(&self, id: ConversationId) -> Option<usize> {
        self.entries.iter().position(|c| c.id == id)
    }

    /// Insert at the front unless an entry with the same id exists.
    pub fn insert_front(&mut self, conversation: Conversation) -> bool {
        if self.contains(conversation.id) {
            return false;
        }
        self.entries.insert(0, conversation);
        true
    }

    /// Point the owning conversation's summary at `message` and move it to
    /// the front.
    pub fn apply_message(&mut self, message: &Message) -> ApplyOutcome {
        let Some(index) = self.position(message.conversation_id) else {
            return ApplyOutcome::Unknown;
        };

        if let Some(current) = &self.entries[index].last_message {
            if current.seq >= message.seq {
                return ApplyOutcome::Stale;
            }
        }

        let mut conversation = self.entries.remove(index);
        conversation.last_message = Some(MessageSummary::from_message(message));
        self.entries.insert(0, conversation);
        ApplyOutcome::Moved
    }

    /// Case-insensitive match on the name `viewer` sees for each entry.
    /// An empty query matches everything.
    pub fn search(&self, query: &str, viewer: UserId) -> Vec<&Conversation> {
        let needle = query.trim().to_lowercase();
        self.entries
            .iter()
            .filter(|c| needle.is_empty() || c.display_name(viewer).to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{conversation, message, user};

    #[test]
    fn incoming_message_moves_entry_to_front() {
        let me = user("Me");
        let a = conversation(&[&me, &user("Ann")]);
        let b = conversation(&[&me, &user("Bob")]);

        let mut store = ConversationStore::new();
        store.replace_all(vec![a.clone(), b.clone()]);

        let msg = message(b.id, 1, &me, "hey bob");
        assert_eq!(store.apply_message(&msg), ApplyOutcome::Moved);

        let ids: Vec<_> = store.list().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert_eq!(
            store.list()[0].last_message.as_ref().map(|s| s.preview.as_str()),
            Some("hey bob")
        );
    }

    #[test]
    fn stale_message_does_not_reorder() {
        let me = user("Me");
        let a = conversation(&[&me, &user("Ann")]);
        let b = conversation(&[&me, &user("Bob")]);

        let mut store = ConversationStore::new();
        store.replace_all(vec![a.clone(), b.clone()]);
        store.apply_message(&message(b.id, 2, &me, "second"));
        store.apply_message(&message(a.id, 1, &me, "other"));

        assert_eq!(
            store.apply_message(&message(b.id, 1, &me, "first")),
            ApplyOutcome::Stale
        );
        assert_eq!(store.list()[0].id, a.id);
        assert_eq!(
            store.get(b.id).and_then(|c| c.last_message.as_ref()).map(|s| s.seq),
            Some(2)
        );
    }

    #[test]
    fn unknown_conversation_is_reported() {
        let me = user("Me");
        let mut store = ConversationStore::new();
        let orphan = conversation(&[&me, &user("Zed")]);
        assert_eq!(
            store.apply_message(&message(orphan.id, 1, &me, "?")),
            ApplyOutcome::Unknown
        );
        assert!(store.is_empty());
    }

    #[test]
    fn insert_front_is_idempotent() {
        let me = user("Me");
        let c = conversation(&[&me, &user("Cat")]);
        let mut store = ConversationStore::new();

        assert!(store.insert_front(c.clone()));
        assert!(!store.insert_front(c.clone()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_all_drops_duplicate_ids() {
        let me = user("Me");
        let c = conversation(&[&me, &user("Cat")]);
        let mut store = ConversationStore::new();
        store.replace_all(vec![c.clone(), c]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn search_by_display_name() {
        let me = user("Me");
        let ann = conversation(&[&me, &user("Ann Lee")]);
        let mut group = conversation(&[&me, &user("Bob"), &user("Cy")]);
        group.is_group = true;
        group.group_name = Some("Weekend Trip".into());

        let mut store = ConversationStore::new();
        store.replace_all(vec![ann.clone(), group.clone()]);

        let hits: Vec<_> = store.search("ann", me.id).iter().map(|c| c.id).collect();
        assert_eq!(hits, vec![ann.id]);
        let hits: Vec<_> = store.search("TRIP", me.id).iter().map(|c| c.id).collect();
        assert_eq!(hits, vec![group.id]);
        // Searching for yourself matches nothing in one-to-one chats.
        assert!(store.search("me", me.id).is_empty());
        assert_eq!(store.search("", me.id).len(), 2);
    }
}
