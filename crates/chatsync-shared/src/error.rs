use thiserror::Error;

use crate::types::{ConversationId, UserId};

/// Request rejected before any side effect was performed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message must carry text or a media reference")]
    EmptyContent,

    #[error("Unknown conversation: {0}")]
    UnknownConversation(ConversationId),

    #[error("User {user} is not a participant of conversation {conversation}")]
    NotAParticipant {
        user: UserId,
        conversation: ConversationId,
    },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("You cannot add yourself as a contact")]
    SelfContact,

    #[error("This user is already in your contacts")]
    AlreadyContact,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),
}

/// Decoding failure for a pushed event frame.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}
