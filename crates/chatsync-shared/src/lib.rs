//! # chatsync-shared
//!
//! Types shared by the chatsync server, store and client: identifiers,
//! wire models, the push-event protocol and validation errors.

pub mod constants;
pub mod error;
pub mod models;
pub mod protocol;
pub mod types;

pub use error::{ProtocolError, ValidationError};
pub use models::*;
pub use protocol::ServerEvent;
pub use types::{ConversationId, MessageId, UserId};
