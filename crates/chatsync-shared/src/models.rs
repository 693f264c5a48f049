//! Domain models exchanged between the server, the durable store and clients.
//!
//! Every struct serializes with camelCase field names so that pushed events
//! and HTTP bodies share one wire shape.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::PREVIEW_MAX_CHARS;
use crate::error::ValidationError;
use crate::types::{ConversationId, MessageId, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Public profile of a user, safe to hand to any other participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub profile_pic: Option<String>,
    pub bio: String,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// What a sender submits. At least one of the two fields must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    pub text: Option<String>,
    /// Opaque reference returned by the media service.
    pub media_ref: Option<String>,
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            media_ref: None,
        }
    }

    pub fn media(media_ref: impl Into<String>) -> Self {
        Self {
            text: None,
            media_ref: Some(media_ref.into()),
        }
    }

    /// Drop blank fields and reject content with nothing left.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let text = self.text.filter(|t| !t.trim().is_empty());
        let media_ref = self.media_ref.filter(|m| !m.trim().is_empty());

        if text.is_none() && media_ref.is_none() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(Self { text, media_ref })
    }
}

/// A persisted message with the sender's display fields resolved.
///
/// Immutable once created, except for `seen_by` which only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    /// Position within the owning conversation, assigned by the store.
    pub seq: u64,
    pub sender_id: UserId,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub text: Option<String>,
    pub media_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub seen_by: BTreeSet<UserId>,
}

/// Preview of the most recent message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub message_id: MessageId,
    pub seq: u64,
    pub sender_id: UserId,
    pub sender_name: String,
    pub preview: String,
    pub has_media: bool,
    pub created_at: DateTime<Utc>,
}

impl MessageSummary {
    pub fn from_message(message: &Message) -> Self {
        Self {
            message_id: message.id,
            seq: message.seq,
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            preview: message
                .text
                .as_deref()
                .map(truncate_preview)
                .unwrap_or_default(),
            has_media: message.media_ref.is_some(),
            created_at: message.created_at,
        }
    }
}

/// Cut `text` to [`PREVIEW_MAX_CHARS`] characters, appending an ellipsis
/// when something was removed.
pub fn truncate_preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A one-to-one or group thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub is_group: bool,
    pub participants: Vec<UserSummary>,
    pub group_name: Option<String>,
    pub group_icon: Option<String>,
    pub group_admin: Option<UserId>,
    pub last_message: Option<MessageSummary>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user: UserId) -> bool {
        self.participants.iter().any(|p| p.id == user)
    }

    pub fn participant_ids(&self) -> impl Iterator<Item = UserId> + '_ {
        self.participants.iter().map(|p| p.id)
    }

    /// Timestamp of the last known activity: the last message, or creation.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|m| m.created_at)
            .unwrap_or(self.created_at)
    }

    /// Name shown to `viewer`: the group name, or the other participant's
    /// full name for one-to-one conversations.
    pub fn display_name(&self, viewer: UserId) -> &str {
        if self.is_group {
            return self.group_name.as_deref().unwrap_or("Group");
        }
        self.participants
            .iter()
            .find(|p| p.id != viewer)
            .map(|p| p.full_name.as_str())
            .unwrap_or("User")
    }
}
