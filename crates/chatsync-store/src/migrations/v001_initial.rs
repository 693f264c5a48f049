//! v001 -- Initial schema creation.
//!
//! Creates `users`, `contacts`, `conversations`, `conversation_participants`,
//! `messages` and `message_seen`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id          TEXT PRIMARY KEY NOT NULL,    -- UUID v4
    username    TEXT NOT NULL UNIQUE,
    full_name   TEXT NOT NULL,
    profile_pic TEXT,
    bio         TEXT NOT NULL DEFAULT '',
    token_hash  TEXT NOT NULL UNIQUE,         -- hex BLAKE3 digest of the bearer token
    created_at  TEXT NOT NULL                 -- RFC-3339, UTC, microseconds
);

-- ----------------------------------------------------------------
-- Contacts (stored in both directions)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contacts (
    owner_id   TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    created_at TEXT NOT NULL,

    PRIMARY KEY (owner_id, contact_id),
    FOREIGN KEY (owner_id) REFERENCES users(id) ON DELETE CASCADE,
    FOREIGN KEY (contact_id) REFERENCES users(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Conversations
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    is_group        INTEGER NOT NULL DEFAULT 0, -- boolean 0/1
    group_name      TEXT,
    group_icon      TEXT,
    group_admin     TEXT,
    last_message_id TEXT,                       -- weak reference, no FK
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL               -- last activity
);

CREATE INDEX IF NOT EXISTS idx_conversations_updated
    ON conversations(updated_at DESC);

CREATE TABLE IF NOT EXISTS conversation_participants (
    conversation_id TEXT NOT NULL,
    user_id         TEXT NOT NULL,

    PRIMARY KEY (conversation_id, user_id),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_participants_user
    ON conversation_participants(user_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    conversation_id TEXT NOT NULL,
    seq             INTEGER NOT NULL,           -- per-conversation, starts at 1
    sender_id       TEXT NOT NULL,
    text            TEXT,
    media_ref       TEXT,
    created_at      TEXT NOT NULL,

    UNIQUE (conversation_id, seq),
    FOREIGN KEY (conversation_id) REFERENCES conversations(id) ON DELETE CASCADE,
    FOREIGN KEY (sender_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS message_seen (
    message_id TEXT NOT NULL,
    user_id    TEXT NOT NULL,

    PRIMARY KEY (message_id, user_id),
    FOREIGN KEY (message_id) REFERENCES messages(id) ON DELETE CASCADE
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
