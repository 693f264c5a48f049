//! # chatsync-store
//!
//! Durable storage for chatsync, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for users,
//! contacts, conversations and messages. Every helper touches a single
//! logical document; nothing here spans documents transactionally.

pub mod contacts;
pub mod conversations;
pub mod database;
pub mod messages;
pub mod migrations;
pub mod users;

mod error;

pub use conversations::NewConversation;
pub use database::Database;
pub use error::StoreError;
pub use users::NewUser;
