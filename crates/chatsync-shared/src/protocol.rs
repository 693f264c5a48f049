use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::{Conversation, Message, UserSummary};
use crate::types::UserId;

/// Every event the server pushes over a client's real-time connection.
///
/// Encoded as a JSON object tagged by `type`, e.g.
/// `{"type":"newMessage","message":{...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A message was posted to a conversation the recipient takes part in
    NewMessage { message: Message },

    /// The recipient became a participant of a new conversation
    NewConversation { conversation: Conversation },

    /// Someone added the recipient as a contact
    NewContactAdded { user_summary: UserSummary },

    /// Presence delta for a single user
    Presence { user_id: UserId, online: bool },

    /// Full online set
    OnlineUsers { user_ids: Vec<UserId> },
}

impl ServerEvent {
    /// Wire name of the event, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::NewMessage { .. } => "newMessage",
            ServerEvent::NewConversation { .. } => "newConversation",
            ServerEvent::NewContactAdded { .. } => "newContactAdded",
            ServerEvent::Presence { .. } => "presence",
            ServerEvent::OnlineUsers { .. } => "onlineUsers",
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(data)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use super::*;
    use crate::types::{ConversationId, MessageId};

    #[test]
    fn test_new_message_wire_shape() {
        let sender = UserId::new();
        let event = ServerEvent::NewMessage {
            message: Message {
                id: MessageId::new(),
                conversation_id: ConversationId::new(),
                seq: 1,
                sender_id: sender,
                sender_name: "Alice".into(),
                sender_avatar: None,
                text: Some("hi".into()),
                media_ref: None,
                created_at: Utc::now(),
                seen_by: BTreeSet::from([sender]),
            },
        };

        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "newMessage");
        assert_eq!(value["message"]["text"], "hi");
        assert_eq!(value["message"]["senderId"], sender.to_string());
        assert_eq!(value["message"]["seenBy"][0], sender.to_string());
    }

    #[test]
    fn test_contact_added_wire_shape() {
        let event = ServerEvent::NewContactAdded {
            user_summary: UserSummary {
                id: UserId::new(),
                username: "bob".into(),
                full_name: "Bob".into(),
                profile_pic: None,
                bio: "hey".into(),
            },
        };
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "newContactAdded");
        assert_eq!(value["userSummary"]["fullName"], "Bob");
    }

    #[test]
    fn test_presence_decodes() {
        let user = UserId::new();
        let raw = format!(r#"{{"type":"presence","userId":"{user}","online":false}}"#);
        let event = ServerEvent::from_json(&raw).unwrap();
        assert_eq!(
            event,
            ServerEvent::Presence {
                user_id: user,
                online: false
            }
        );
        assert_eq!(event.name(), "presence");
    }

    #[test]
    fn test_unknown_event_rejected() {
        assert!(ServerEvent::from_json(r#"{"type":"typing"}"#).is_err());
    }
}
