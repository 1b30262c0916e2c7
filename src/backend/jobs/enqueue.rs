//! Enqueue job: moves due AutoMessages onto the work queue

use chrono::{DateTime, Utc};

use crate::backend::error::BackendError;
use crate::backend::queue::WorkQueue;
use crate::backend::store::DocumentStore;
use crate::shared::messaging::QueueItem;

/// Outcome of one enqueue tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueReport {
    pub due: usize,
    pub queued: usize,
    /// Push failed; the item stays eligible for the next tick
    pub skipped: usize,
}

/// Push every due, unqueued AutoMessage, then latch `is_queued`
///
/// The latch is only flipped after the queue accepted the push, so a crash
/// in between causes a duplicate push rather than a lost message. The
/// consumer ignores items whose AutoMessage is already sent.
pub async fn enqueue_due(
    store: &dyn DocumentStore,
    queue: &dyn WorkQueue,
    now: DateTime<Utc>,
) -> Result<EnqueueReport, BackendError> {
    let due = store.due_auto_messages(now).await?;
    let mut report = EnqueueReport {
        due: due.len(),
        ..Default::default()
    };
    if due.is_empty() {
        return Ok(report);
    }

    tracing::info!("[Jobs] Queueing {} auto-messages", due.len());
    for auto_message in &due {
        if let Err(err) = queue.push(&QueueItem::from(auto_message)).await {
            tracing::warn!("[Jobs] Failed to queue auto-message {}: {}", auto_message.id, err);
            report.skipped += 1;
            continue;
        }
        if store.mark_queued(auto_message.id).await? {
            report.queued += 1;
        } else {
            tracing::debug!("[Jobs] Auto-message {} was already queued", auto_message.id);
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::queue::{Delivery, MemoryQueue};
    use crate::backend::store::MemoryStore;
    use crate::shared::messaging::AutoMessage;
    use async_trait::async_trait;
    use chrono::Duration;
    use uuid::Uuid;

    struct RejectingQueue;

    #[async_trait]
    impl WorkQueue for RejectingQueue {
        async fn push(&self, _item: &QueueItem) -> Result<(), BackendError> {
            Err(BackendError::infrastructure("queue unavailable"))
        }
        async fn receive(&self) -> Result<Delivery, BackendError> {
            Err(BackendError::infrastructure("queue unavailable"))
        }
        async fn ack(&self, _tag: u64) -> Result<(), BackendError> {
            Ok(())
        }
        async fn nack(&self, _tag: u64) -> Result<(), BackendError> {
            Ok(())
        }
        async fn pending(&self) -> Result<usize, BackendError> {
            Ok(0)
        }
    }

    fn auto_message(send_date: DateTime<Utc>) -> AutoMessage {
        AutoMessage::new(Uuid::new_v4(), Uuid::new_v4(), "hi".into(), send_date)
    }

    #[tokio::test]
    async fn test_only_due_messages_are_queued_once() {
        let store = MemoryStore::new();
        let queue = MemoryQueue::new();
        let now = Utc::now();
        let due = store.create_auto_message(auto_message(now - Duration::minutes(1))).await.unwrap();
        let later = store.create_auto_message(auto_message(now + Duration::hours(1))).await.unwrap();

        let report = enqueue_due(&store, &queue, now).await.unwrap();
        assert_eq!(report, EnqueueReport { due: 1, queued: 1, skipped: 0 });
        assert_eq!(queue.pending().await.unwrap(), 1);
        assert!(store.find_auto_message(due.id).await.unwrap().unwrap().is_queued);
        assert!(!store.find_auto_message(later.id).await.unwrap().unwrap().is_queued);

        let again = enqueue_due(&store, &queue, now).await.unwrap();
        assert_eq!(again, EnqueueReport::default());
        assert_eq!(queue.pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_push_failure_leaves_message_eligible() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let due = store.create_auto_message(auto_message(now)).await.unwrap();

        let report = enqueue_due(&store, &RejectingQueue, now).await.unwrap();
        assert_eq!(report, EnqueueReport { due: 1, queued: 0, skipped: 1 });
        assert!(!store.find_auto_message(due.id).await.unwrap().unwrap().is_queued);

        let queue = MemoryQueue::new();
        let retry = enqueue_due(&store, &queue, now).await.unwrap();
        assert_eq!(retry.queued, 1);
    }
}
