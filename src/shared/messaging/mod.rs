//! Messaging Types
//!
//! Records owned by the document store and referenced by id everywhere else.

pub mod auto_message;
pub mod conversation;
pub mod message;
pub mod user;

pub use auto_message::{AutoMessage, AutoMessageStage, QueueItem};
pub use conversation::{participant_set, Conversation};
pub use message::{validate_content, ChatMessage, MessageView};
pub use user::{UserRecord, UserRole, UserSummary};
