//! # chatsync-client
//!
//! Client side of chatsync: keeps the conversation list, the open
//! conversation's messages, unseen counts, contacts and presence in step
//! with what the server pushes.

pub mod backend;
pub mod config;
pub mod contacts;
pub mod conversations;
pub mod error;
pub mod events;
pub mod messages;
pub mod presence;
pub mod push;
pub mod session;
pub mod unseen;

#[cfg(test)]
mod testing;

pub use backend::{ChatBackend, HttpBackend};
pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{LogListener, SessionListener};
pub use session::ChatSession;
