use std::collections::HashMap;

use chatsync_shared::ConversationId;

/// Per-conversation count of messages that arrived while the conversation
/// was not open. Counts only grow until [`reset`](Self::reset).
#[derive(Debug, Default, Clone)]
pub struct UnseenCounter {
    counts: HashMap<ConversationId, u32>,
}

impl UnseenCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more unseen message. Returns the new count.
    pub fn increment(&mut self, conversation: ConversationId) -> u32 {
        let count = self.counts.entry(conversation).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Zero the count. Returns `true` if it was non-zero.
    pub fn reset(&mut self, conversation: ConversationId) -> bool {
        self.counts.remove(&conversation).is_some_and(|n| n > 0)
    }

    pub fn get(&self, conversation: ConversationId) -> u32 {
        self.counts.get(&conversation).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_until_reset() {
        let mut unseen = UnseenCounter::new();
        let c = ConversationId::new();

        assert_eq!(unseen.get(c), 0);
        assert_eq!(unseen.increment(c), 1);
        assert_eq!(unseen.increment(c), 2);
        assert_eq!(unseen.total(), 2);

        assert!(unseen.reset(c));
        assert_eq!(unseen.get(c), 0);
        assert!(!unseen.reset(c));
    }

    #[test]
    fn counts_are_independent() {
        let mut unseen = UnseenCounter::new();
        let a = ConversationId::new();
        let b = ConversationId::new();
        unseen.increment(a);
        unseen.increment(b);
        unseen.increment(b);
        unseen.reset(a);
        assert_eq!(unseen.get(b), 2);
        assert_eq!(unseen.total(), 2);
    }
}
