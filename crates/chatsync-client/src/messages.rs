use chatsync_shared::{ConversationId, Message};

/// Messages of the single open conversation, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct MessageStream {
    open: Option<ConversationId>,
    messages: Vec<Message>,
}

impl MessageStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to `conversation` with its full ascending history.
    pub fn open(&mut self, conversation: ConversationId, history: Vec<Message>) {
        self.open = Some(conversation);
        self.messages = history;
    }

    pub fn close(&mut self) {
        self.open = None;
        self.messages.clear();
    }

    pub fn open_conversation(&self) -> Option<ConversationId> {
        self.open
    }

    pub fn is_open(&self, conversation: ConversationId) -> bool {
        self.open == Some(conversation)
    }

    /// Append at the end if `message` belongs to the open conversation and
    /// is not already present. No re-sorting.
    pub fn append(&mut self, message: Message) -> bool {
        if !self.is_open(message.conversation_id) {
            return false;
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{conversation, message, user};

    #[test]
    fn appends_only_to_open_conversation() {
        let me = user("Me");
        let open = conversation(&[&me, &user("Ann")]);
        let other = conversation(&[&me, &user("Bob")]);

        let mut stream = MessageStream::new();
        assert!(!stream.append(message(open.id, 1, &me, "too early")));

        stream.open(open.id, vec![message(open.id, 1, &me, "history")]);
        assert!(stream.append(message(open.id, 2, &me, "new")));
        assert!(!stream.append(message(other.id, 1, &me, "elsewhere")));

        let texts: Vec<_> = stream
            .messages()
            .iter()
            .filter_map(|m| m.text.as_deref())
            .collect();
        assert_eq!(texts, vec!["history", "new"]);
    }

    #[test]
    fn duplicate_delivery_is_ignored() {
        let me = user("Me");
        let c = conversation(&[&me, &user("Ann")]);
        let mut stream = MessageStream::new();
        stream.open(c.id, Vec::new());

        let m = message(c.id, 1, &me, "once");
        assert!(stream.append(m.clone()));
        assert!(!stream.append(m));
        assert_eq!(stream.messages().len(), 1);
    }

    #[test]
    fn close_clears_state() {
        let me = user("Me");
        let c = conversation(&[&me, &user("Ann")]);
        let mut stream = MessageStream::new();
        stream.open(c.id, vec![message(c.id, 1, &me, "x")]);
        stream.close();
        assert!(stream.open_conversation().is_none());
        assert!(stream.messages().is_empty());
    }
}
