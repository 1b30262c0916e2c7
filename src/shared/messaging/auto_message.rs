//! Scheduled Message Data Structure
//!
//! An AutoMessage is a message composed ahead of time and delivered through
//! the work queue once its send date has passed. It moves through
//! `composed → queued → sent`; the two flags are write-once latches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message waiting for its send date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutoMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub send_date: DateTime<Utc>,
    /// Set once, after the queue acknowledged the push
    pub is_queued: bool,
    /// Set once, after the consumer materialized the message
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl AutoMessage {
    pub fn new(sender_id: Uuid, receiver_id: Uuid, content: String, send_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content,
            send_date,
            is_queued: false,
            is_sent: false,
            created_at: Utc::now(),
        }
    }

    /// Due for the enqueue job at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_queued && self.send_date <= now
    }

    /// Position in the delivery state machine
    pub fn stage(&self) -> AutoMessageStage {
        match (self.is_queued, self.is_sent) {
            (_, true) => AutoMessageStage::Sent,
            (true, false) => AutoMessageStage::Queued,
            (false, false) => AutoMessageStage::Composed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoMessageStage {
    Composed,
    Queued,
    Sent,
}

/// Payload carried by the durable work queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueItem {
    pub sender: Uuid,
    pub receiver: Uuid,
    pub content: String,
    pub auto_message_id: Uuid,
}

impl From<&AutoMessage> for QueueItem {
    fn from(auto: &AutoMessage) -> Self {
        Self {
            sender: auto.sender_id,
            receiver: auto.receiver_id,
            content: auto.content.clone(),
            auto_message_id: auto.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_due_and_stage() {
        let now = Utc::now();
        let mut auto = AutoMessage::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Let's catch up soon!".to_string(),
            now - Duration::minutes(1),
        );
        assert!(auto.is_due(now));
        assert_eq!(auto.stage(), AutoMessageStage::Composed);

        auto.is_queued = true;
        assert!(!auto.is_due(now));
        assert_eq!(auto.stage(), AutoMessageStage::Queued);

        auto.is_sent = true;
        assert_eq!(auto.stage(), AutoMessageStage::Sent);
    }

    #[test]
    fn test_future_message_not_due() {
        let now = Utc::now();
        let auto = AutoMessage::new(Uuid::new_v4(), Uuid::new_v4(), "hi".into(), now + Duration::hours(1));
        assert!(!auto.is_due(now));
    }

    #[test]
    fn test_queue_item_wire_shape() {
        let auto = AutoMessage::new(Uuid::new_v4(), Uuid::new_v4(), "hi".into(), Utc::now());
        let value = serde_json::to_value(QueueItem::from(&auto)).unwrap();
        assert_eq!(value["auto_message_id"], serde_json::json!(auto.id));
        assert_eq!(value["sender"], serde_json::json!(auto.sender_id));
        assert_eq!(value["receiver"], serde_json::json!(auto.receiver_id));
        assert_eq!(value["content"], "hi");
    }
}
