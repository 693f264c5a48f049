//! CRUD operations for users.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use chatsync_shared::{UserId, UserSummary};

use crate::database::{fmt_ts, uuid_col, Database};
use crate::error::{Result, StoreError};

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub full_name: String,
    pub bio: String,
    pub profile_pic: Option<String>,
    /// Hex digest of the bearer token. The token itself is never stored.
    pub token_hash: String,
}

pub(crate) const USER_COLUMNS: &str = "u.id, u.username, u.full_name, u.profile_pic, u.bio";

impl Database {
    /// Insert a new user. Fails with [`StoreError::Conflict`] when the
    /// username is taken.
    pub fn create_user(&self, user: &NewUser) -> Result<UserSummary> {
        let id = UserId::new();

        self.conn()
            .execute(
                "INSERT INTO users (id, username, full_name, profile_pic, bio, token_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.0.to_string(),
                    user.username,
                    user.full_name,
                    user.profile_pic,
                    user.bio,
                    user.token_hash,
                    fmt_ts(&Utc::now()),
                ],
            )
            .map_err(StoreError::from_query)?;

        Ok(UserSummary {
            id,
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            profile_pic: user.profile_pic.clone(),
            bio: user.bio.clone(),
        })
    }

    pub fn get_user(&self, id: UserId) -> Result<UserSummary> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?1"),
                params![id.0.to_string()],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    pub fn find_user_by_username(&self, username: &str) -> Result<Option<UserSummary>> {
        Ok(self
            .conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.username = ?1"),
                params![username],
                row_to_user,
            )
            .optional()?)
    }

    /// Resolve a bearer-token digest to the owning user.
    pub fn find_user_by_token_hash(&self, token_hash: &str) -> Result<Option<UserId>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id FROM users WHERE token_hash = ?1",
                params![token_hash],
                |row| uuid_col(row, 0).map(UserId),
            )
            .optional()?)
    }
}

/// Map a row selected with [`USER_COLUMNS`] (starting at column 0) to a
/// [`UserSummary`].
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserSummary> {
    user_at(row, 0)
}

/// Same as [`row_to_user`] but reading [`USER_COLUMNS`] from `offset`.
pub(crate) fn user_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<UserSummary> {
    let id: Uuid = uuid_col(row, offset)?;
    Ok(UserSummary {
        id: UserId(id),
        username: row.get(offset + 1)?,
        full_name: row.get(offset + 2)?,
        profile_pic: row.get(offset + 3)?,
        bio: row.get(offset + 4)?,
    })
}
