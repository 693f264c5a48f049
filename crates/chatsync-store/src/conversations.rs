//! CRUD operations for conversations and their participants.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use chatsync_shared::{Conversation, ConversationId, MessageId, MessageSummary, UserId, UserSummary};

use crate::database::{fmt_ts, opt_uuid_col, ts_col, uuid_col, Database};
use crate::error::{Result, StoreError};
use crate::users::{row_to_user, USER_COLUMNS};

/// Fields required to create a conversation.
#[derive(Debug, Clone, Default)]
pub struct NewConversation {
    pub is_group: bool,
    pub participants: Vec<UserId>,
    pub group_name: Option<String>,
    pub group_icon: Option<String>,
    pub group_admin: Option<UserId>,
}

impl NewConversation {
    pub fn direct(a: UserId, b: UserId) -> Self {
        Self {
            participants: vec![a, b],
            ..Self::default()
        }
    }

    pub fn group(name: impl Into<String>, admin: UserId, participants: Vec<UserId>) -> Self {
        Self {
            is_group: true,
            participants,
            group_name: Some(name.into()),
            group_icon: None,
            group_admin: Some(admin),
        }
    }
}

/// Row of the `conversations` table before participants and the last
/// message are resolved.
struct ConversationRow {
    id: ConversationId,
    is_group: bool,
    group_name: Option<String>,
    group_icon: Option<String>,
    group_admin: Option<UserId>,
    last_message_id: Option<MessageId>,
    created_at: chrono::DateTime<Utc>,
}

const CONVERSATION_COLUMNS: &str =
    "c.id, c.is_group, c.group_name, c.group_icon, c.group_admin, c.last_message_id, c.created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a conversation and its participants. Duplicate participant ids
    /// collapse into one.
    pub fn create_conversation(&self, new: &NewConversation) -> Result<Conversation> {
        let id = ConversationId::new();
        let now = fmt_ts(&Utc::now());

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO conversations
                (id, is_group, group_name, group_icon, group_admin, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![
                id.0.to_string(),
                new.is_group,
                new.group_name,
                new.group_icon,
                new.group_admin.map(|a| a.0.to_string()),
                now,
            ],
        )?;
        for participant in &new.participants {
            tx.execute(
                "INSERT OR IGNORE INTO conversation_participants (conversation_id, user_id)
                 VALUES (?1, ?2)",
                params![id.0.to_string(), participant.0.to_string()],
            )?;
        }
        tx.commit()?;

        tracing::debug!(
            conversation = %id,
            is_group = new.is_group,
            participants = new.participants.len(),
            "conversation created"
        );

        self.get_conversation(id)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_conversation(&self, id: ConversationId) -> Result<Conversation> {
        let row = self
            .conn()
            .query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?1"),
                params![id.0.to_string()],
                row_to_conversation,
            )
            .map_err(StoreError::from_query)?;
        self.hydrate(row)
    }

    /// The one-to-one conversation between `a` and `b`, if any.
    pub fn find_direct_conversation(&self, a: UserId, b: UserId) -> Result<Option<Conversation>> {
        let id = self
            .conn()
            .query_row(
                "SELECT c.id FROM conversations c
                 JOIN conversation_participants pa
                   ON pa.conversation_id = c.id AND pa.user_id = ?1
                 JOIN conversation_participants pb
                   ON pb.conversation_id = c.id AND pb.user_id = ?2
                 WHERE c.is_group = 0
                 LIMIT 1",
                params![a.0.to_string(), b.0.to_string()],
                |row| uuid_col(row, 0),
            )
            .optional()?;

        id.map(|id| self.get_conversation(ConversationId(id)))
            .transpose()
    }

    /// Every conversation `user_id` takes part in, most recently active first.
    pub fn find_conversations_by_participant(&self, user_id: UserId) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONVERSATION_COLUMNS}
             FROM conversations c
             JOIN conversation_participants p ON p.conversation_id = c.id
             WHERE p.user_id = ?1
             ORDER BY c.updated_at DESC, c.rowid DESC"
        ))?;

        let rows = stmt.query_map(params![user_id.0.to_string()], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(self.hydrate(row?)?);
        }
        Ok(conversations)
    }

    pub fn participants_of(&self, id: ConversationId) -> Result<Vec<UserSummary>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS}
             FROM conversation_participants p JOIN users u ON u.id = p.user_id
             WHERE p.conversation_id = ?1
             ORDER BY u.username ASC"
        ))?;

        let rows = stmt.query_map(params![id.0.to_string()], row_to_user)?;

        let mut participants = Vec::new();
        for row in rows {
            participants.push(row?);
        }
        Ok(participants)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Point the conversation's summary at `message_id` and bump its last
    /// activity to that message's timestamp.
    ///
    /// The pointer only moves forward in `seq`: an update carrying an older
    /// message than the current summary leaves the row untouched and still
    /// succeeds. A message from another conversation is `NotFound`.
    pub fn update_conversation_summary(
        &self,
        id: ConversationId,
        message_id: MessageId,
    ) -> Result<()> {
        let belongs: bool = self.conn().query_row(
            "SELECT EXISTS (SELECT 1 FROM messages WHERE id = ?2 AND conversation_id = ?1)",
            params![id.0.to_string(), message_id.0.to_string()],
            |row| row.get(0),
        )?;
        if !belongs {
            return Err(StoreError::NotFound);
        }

        let affected = self.conn().execute(
            "UPDATE conversations
             SET last_message_id = ?2,
                 updated_at = (SELECT created_at FROM messages WHERE id = ?2)
             WHERE id = ?1
               AND (last_message_id IS NULL
                    OR (SELECT seq FROM messages WHERE id = ?2)
                       > COALESCE(
                           (SELECT seq FROM messages WHERE id = conversations.last_message_id),
                           0))",
            params![id.0.to_string(), message_id.0.to_string()],
        )?;

        if affected == 0 {
            tracing::debug!(
                conversation = %id,
                message = %message_id,
                "older message, summary kept"
            );
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn hydrate(&self, row: ConversationRow) -> Result<Conversation> {
        let participants = self.participants_of(row.id)?;

        let last_message = match row.last_message_id {
            Some(message_id) => match self.get_message(message_id) {
                Ok(message) => Some(MessageSummary::from_message(&message)),
                Err(StoreError::NotFound) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(Conversation {
            id: row.id,
            is_group: row.is_group,
            participants,
            group_name: row.group_name,
            group_icon: row.group_icon,
            group_admin: row.group_admin,
            last_message,
            created_at: row.created_at,
        })
    }
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: ConversationId(uuid_col(row, 0)?),
        is_group: row.get(1)?,
        group_name: row.get(2)?,
        group_icon: row.get(3)?,
        group_admin: opt_uuid_col(row, 4)?.map(UserId),
        last_message_id: opt_uuid_col(row, 5)?.map(MessageId),
        created_at: ts_col(row, 6)?,
    })
}
