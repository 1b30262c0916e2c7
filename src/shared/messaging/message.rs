//! Chat Message Data Structure
//!
//! Represents a message in a conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserSummary;
use crate::shared::error::SharedError;

/// Longest accepted message body, in characters
pub const MAX_MESSAGE_LENGTH: usize = 10_000;

/// Represents a persisted chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Unique message ID
    pub id: Uuid,
    /// Conversation this message belongs to
    pub conversation_id: Uuid,
    /// User who sent the message
    pub sender_id: Uuid,
    pub content: String,
    /// Users who have read the message; grows monotonically, starts as [sender]
    pub read_by: Vec<Uuid>,
    /// AutoMessage this message was materialized from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_auto_message: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message, read by its sender only
    pub fn new(conversation_id: Uuid, sender_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content,
            read_by: vec![sender_id],
            source_auto_message: None,
            created_at: Utc::now(),
        }
    }

    /// Tag the message with the AutoMessage it was materialized from
    pub fn from_auto_message(mut self, auto_message_id: Uuid) -> Self {
        self.source_auto_message = Some(auto_message_id);
        self
    }

    /// Set-union `user_id` into `read_by`. Returns true if it was added.
    pub fn mark_read_by(&mut self, user_id: Uuid) -> bool {
        if self.read_by.contains(&user_id) {
            return false;
        }
        self.read_by.push(user_id);
        true
    }

    /// Attach the resolved sender for read-back
    pub fn into_view(self, sender: UserSummary) -> MessageView {
        MessageView {
            id: self.id,
            conversation_id: self.conversation_id,
            sender,
            content: self.content,
            read_by: self.read_by,
            created_at: self.created_at,
        }
    }
}

/// Message read-back with the sender resolved to a display form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageView {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: UserSummary,
    pub content: String,
    pub read_by: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Validate outgoing message content
pub fn validate_content(content: &str) -> Result<(), SharedError> {
    if content.trim().is_empty() {
        return Err(SharedError::validation("content", "Message content cannot be empty"));
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(SharedError::validation(
            "content",
            format!("Message content exceeds {} characters", MAX_MESSAGE_LENGTH),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_read_by_sender() {
        let sender = Uuid::new_v4();
        let message = ChatMessage::new(Uuid::new_v4(), sender, "hi".to_string());
        assert_eq!(message.read_by, vec![sender]);
        assert!(message.source_auto_message.is_none());
    }

    #[test]
    fn test_mark_read_by_is_set_union() {
        let sender = Uuid::new_v4();
        let reader = Uuid::new_v4();
        let mut message = ChatMessage::new(Uuid::new_v4(), sender, "hi".to_string());

        assert!(message.mark_read_by(reader));
        assert!(!message.mark_read_by(reader));
        assert!(!message.mark_read_by(sender));
        assert_eq!(message.read_by, vec![sender, reader]);
    }

    #[test]
    fn test_validate_content() {
        assert!(validate_content("hello").is_ok());
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(MAX_MESSAGE_LENGTH)).is_ok());
        assert!(validate_content(&"x".repeat(MAX_MESSAGE_LENGTH + 1)).is_err());
    }
}
