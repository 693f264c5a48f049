//! Symmetric contact relationships.

use chrono::Utc;
use rusqlite::params;

use chatsync_shared::{UserId, UserSummary};

use crate::database::{fmt_ts, Database};
use crate::error::Result;
use crate::users::{row_to_user, USER_COLUMNS};

impl Database {
    /// Record `a` and `b` as each other's contacts. Returns `true` if either
    /// direction was new.
    pub fn add_contact(&self, a: UserId, b: UserId) -> Result<bool> {
        let now = fmt_ts(&Utc::now());
        let mut affected = 0;
        for (owner, contact) in [(a, b), (b, a)] {
            affected += self.conn().execute(
                "INSERT OR IGNORE INTO contacts (owner_id, contact_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![owner.0.to_string(), contact.0.to_string(), now],
            )?;
        }
        Ok(affected > 0)
    }

    pub fn is_contact(&self, owner: UserId, contact: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM contacts WHERE owner_id = ?1 AND contact_id = ?2",
            params![owner.0.to_string(), contact.0.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Contacts of `owner`, ordered by full name.
    pub fn list_contacts(&self, owner: UserId) -> Result<Vec<UserSummary>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {USER_COLUMNS}
             FROM contacts c JOIN users u ON u.id = c.contact_id
             WHERE c.owner_id = ?1
             ORDER BY u.full_name ASC"
        ))?;

        let rows = stmt.query_map(params![owner.0.to_string()], row_to_user)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }
}
