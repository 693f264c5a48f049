//! Message persistence.
//!
//! Messages are append-only. Each one receives a per-conversation `seq`
//! at insert, which defines history order independently of wall-clock
//! timestamps.

use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use rusqlite::params;

use chatsync_shared::{ConversationId, Message, MessageContent, MessageId, UserId};

use crate::database::{fmt_ts, ts_col, uuid_col, Database};
use crate::error::{Result, StoreError};

const MESSAGE_SELECT: &str =
    "SELECT m.id, m.conversation_id, m.seq, m.sender_id, u.full_name, u.profile_pic,
            m.text, m.media_ref, m.created_at
     FROM messages m JOIN users u ON u.id = m.sender_id";

impl Database {
    /// Persist a new message with `seen_by = {sender}` and return it with
    /// the server-assigned id, sequence number and timestamp.
    pub fn create_message(
        &self,
        conversation_id: ConversationId,
        sender_id: UserId,
        content: &MessageContent,
    ) -> Result<Message> {
        let id = MessageId::new();
        let now = Utc::now();

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO messages (id, conversation_id, seq, sender_id, text, media_ref, created_at)
             VALUES (
                ?1, ?2,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_id = ?2),
                ?3, ?4, ?5, ?6
             )",
            params![
                id.0.to_string(),
                conversation_id.0.to_string(),
                sender_id.0.to_string(),
                content.text,
                content.media_ref,
                fmt_ts(&now),
            ],
        )?;
        tx.execute(
            "INSERT INTO message_seen (message_id, user_id) VALUES (?1, ?2)",
            params![id.0.to_string(), sender_id.0.to_string()],
        )?;
        tx.commit()?;

        self.get_message(id)
    }

    pub fn get_message(&self, id: MessageId) -> Result<Message> {
        let mut message = self
            .conn()
            .query_row(
                &format!("{MESSAGE_SELECT} WHERE m.id = ?1"),
                params![id.0.to_string()],
                row_to_message,
            )
            .map_err(StoreError::from_query)?;

        let mut stmt = self
            .conn()
            .prepare("SELECT user_id FROM message_seen WHERE message_id = ?1")?;
        let rows = stmt.query_map(params![id.0.to_string()], |row| uuid_col(row, 0))?;
        for row in rows {
            message.seen_by.insert(UserId(row?));
        }
        Ok(message)
    }

    /// Full history of a conversation in ascending `seq` order.
    pub fn find_messages_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>> {
        let conv = conversation_id.0.to_string();

        let mut seen: HashMap<MessageId, BTreeSet<UserId>> = HashMap::new();
        {
            let mut stmt = self.conn().prepare(
                "SELECT s.message_id, s.user_id
                 FROM message_seen s JOIN messages m ON m.id = s.message_id
                 WHERE m.conversation_id = ?1",
            )?;
            let rows = stmt.query_map(params![conv], |row| {
                Ok((MessageId(uuid_col(row, 0)?), UserId(uuid_col(row, 1)?)))
            })?;
            for row in rows {
                let (message_id, user_id) = row?;
                seen.entry(message_id).or_default().insert(user_id);
            }
        }

        let mut stmt = self.conn().prepare(&format!(
            "{MESSAGE_SELECT} WHERE m.conversation_id = ?1 ORDER BY m.seq ASC"
        ))?;
        let rows = stmt.query_map(params![conv], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            let mut message = row?;
            if let Some(seen_by) = seen.remove(&message.id) {
                message.seen_by = seen_by;
            }
            messages.push(message);
        }
        Ok(messages)
    }

    /// Add `user_id` to `seen_by` of every message in the conversation it has
    /// not seen yet. Returns how many messages changed.
    pub fn mark_seen(&self, conversation_id: ConversationId, user_id: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO message_seen (message_id, user_id)
             SELECT id, ?2 FROM messages WHERE conversation_id = ?1",
            params![conversation_id.0.to_string(), user_id.0.to_string()],
        )?;
        Ok(affected)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let seq: i64 = row.get(2)?;
    Ok(Message {
        id: MessageId(uuid_col(row, 0)?),
        conversation_id: ConversationId(uuid_col(row, 1)?),
        seq: seq as u64,
        sender_id: UserId(uuid_col(row, 3)?),
        sender_name: row.get(4)?,
        sender_avatar: row.get(5)?,
        text: row.get(6)?,
        media_ref: row.get(7)?,
        created_at: ts_col(row, 8)?,
        seen_by: BTreeSet::new(),
    })
}
