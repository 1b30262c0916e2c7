/**
 * Real-time Event System
 *
 * Server-originated events pushed to live connections. Every event is
 * serialized as `{"event": <name>, "data": <payload>}` so clients can
 * dispatch on the event name alone.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::messaging::{Conversation, MessageView};

/// Why a participant is being told about a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConversationUpdateKind {
    /// The sender joined an existing conversation
    UserJoined,
    /// The sender created a new conversation
    ConversationCreated,
}

/// Event pushed from the server to a connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// A user opened a session
    UserOnline { user_id: Uuid },
    /// A user's session closed
    UserOffline { user_id: Uuid },
    /// Membership notification for the other participants of a conversation
    ConversationUpdate {
        #[serde(rename = "type")]
        kind: ConversationUpdateKind,
        conversation: Conversation,
        user_id: Uuid,
    },
    /// New message for a participant who did not send it
    ReceiveMessage {
        conversation_id: Uuid,
        message: MessageView,
    },
    /// Echo of a sent message to the originating connection
    MessageDelivered {
        conversation_id: Uuid,
        message: MessageView,
    },
    /// Scheduled message delivered by the queue consumer
    MessageReceived {
        conversation_id: Uuid,
        message: MessageView,
    },
    /// Read receipt for room subscribers
    MessageRead {
        user_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    /// Typing indicator for room subscribers
    UserTyping {
        user_id: Uuid,
        conversation_id: Uuid,
        is_typing: bool,
    },
    /// Response to a client frame that carried an ack id
    Ack { id: u64, response: serde_json::Value },
    /// A frame could not be decoded
    Error { message: String },
}

impl RealtimeEvent {
    /// Wire name of the event, for logging
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::UserOnline { .. } => "user_online",
            RealtimeEvent::UserOffline { .. } => "user_offline",
            RealtimeEvent::ConversationUpdate { .. } => "conversation_update",
            RealtimeEvent::ReceiveMessage { .. } => "receive_message",
            RealtimeEvent::MessageDelivered { .. } => "message_delivered",
            RealtimeEvent::MessageReceived { .. } => "message_received",
            RealtimeEvent::MessageRead { .. } => "message_read",
            RealtimeEvent::UserTyping { .. } => "user_typing",
            RealtimeEvent::Ack { .. } => "ack",
            RealtimeEvent::Error { .. } => "error",
        }
    }

    /// Create a typing event
    pub fn typing(user_id: Uuid, conversation_id: Uuid, is_typing: bool) -> Self {
        Self::UserTyping {
            user_id,
            conversation_id,
            is_typing,
        }
    }

    /// Create a read receipt stamped with the current time
    pub fn read_receipt(user_id: Uuid, conversation_id: Uuid, message_id: Uuid) -> Self {
        Self::MessageRead {
            user_id,
            conversation_id,
            message_id,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope() {
        let user_id = Uuid::new_v4();
        let value = serde_json::to_value(RealtimeEvent::UserOnline { user_id }).unwrap();
        assert_eq!(value["event"], "user_online");
        assert_eq!(value["data"]["user_id"], serde_json::json!(user_id));
    }

    #[test]
    fn test_conversation_update_type_field() {
        let conversation = Conversation::new(vec![Uuid::new_v4(), Uuid::new_v4()]);
        let event = RealtimeEvent::ConversationUpdate {
            kind: ConversationUpdateKind::ConversationCreated,
            conversation,
            user_id: Uuid::new_v4(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "conversation_update");
        assert_eq!(value["data"]["type"], "conversation_created");
        assert_eq!(event.name(), "conversation_update");
    }

    #[test]
    fn test_typing_event() {
        let event = RealtimeEvent::typing(Uuid::new_v4(), Uuid::new_v4(), true);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "user_typing");
        assert_eq!(value["data"]["is_typing"], true);
    }
}
