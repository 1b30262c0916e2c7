//! In-memory work queue
//!
//! Not durable across restarts. Unacknowledged deliveries stay in an
//! in-flight table until `ack`, `nack`, or `recover` moves them.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{Mutex, Notify};

use super::{Delivery, WorkQueue};
use crate::backend::error::BackendError;
use crate::shared::messaging::QueueItem;

#[derive(Default)]
struct QueueState {
    next_tag: u64,
    ready: VecDeque<(u64, QueueItem, u32)>,
    in_flight: HashMap<u64, (QueueItem, u32)>,
}

#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put every in-flight delivery back on the queue, as after a consumer crash
    pub async fn recover(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut tags: Vec<u64> = state.in_flight.keys().copied().collect();
        tags.sort();
        for tag in &tags {
            if let Some((item, attempts)) = state.in_flight.remove(tag) {
                state.ready.push_back((*tag, item, attempts));
            }
        }
        for _ in &tags {
            self.notify.notify_one();
        }
        tags.len()
    }

    /// Non-blocking receive
    pub async fn try_receive(&self) -> Option<Delivery> {
        let mut state = self.state.lock().await;
        let (tag, item, attempts) = state.ready.pop_front()?;
        let attempts = attempts + 1;
        state.in_flight.insert(tag, (item.clone(), attempts));
        Some(Delivery { tag, item, attempts })
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn push(&self, item: &QueueItem) -> Result<(), BackendError> {
        {
            let mut state = self.state.lock().await;
            state.next_tag += 1;
            let tag = state.next_tag;
            state.ready.push_back((tag, item.clone(), 0));
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn receive(&self) -> Result<Delivery, BackendError> {
        loop {
            if let Some(delivery) = self.try_receive().await {
                return Ok(delivery);
            }
            self.notify.notified().await;
        }
    }

    async fn ack(&self, tag: u64) -> Result<(), BackendError> {
        self.state.lock().await.in_flight.remove(&tag);
        Ok(())
    }

    async fn nack(&self, tag: u64) -> Result<(), BackendError> {
        {
            let mut state = self.state.lock().await;
            if let Some((item, attempts)) = state.in_flight.remove(&tag) {
                state.ready.push_back((tag, item, attempts));
            }
        }
        self.notify.notify_one();
        Ok(())
    }

    async fn pending(&self) -> Result<usize, BackendError> {
        let state = self.state.lock().await;
        Ok(state.ready.len() + state.in_flight.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn item(content: &str) -> QueueItem {
        QueueItem {
            sender: Uuid::new_v4(),
            receiver: Uuid::new_v4(),
            content: content.to_string(),
            auto_message_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_fifo_and_ack() {
        let queue = MemoryQueue::new();
        queue.push(&item("a")).await.unwrap();
        queue.push(&item("b")).await.unwrap();

        let first = queue.receive().await.unwrap();
        assert_eq!(first.item.content, "a");
        assert_eq!(first.attempts, 1);
        assert_eq!(queue.pending().await.unwrap(), 2);

        queue.ack(first.tag).await.unwrap();
        assert_eq!(queue.pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_nack_redelivers() {
        let queue = MemoryQueue::new();
        queue.push(&item("a")).await.unwrap();

        let first = queue.receive().await.unwrap();
        queue.nack(first.tag).await.unwrap();

        let again = queue.receive().await.unwrap();
        assert_eq!(again.tag, first.tag);
        assert_eq!(again.attempts, 2);
    }

    #[tokio::test]
    async fn test_recover_redelivers_unacked() {
        let queue = MemoryQueue::new();
        queue.push(&item("a")).await.unwrap();
        let delivery = queue.receive().await.unwrap();
        assert!(queue.try_receive().await.is_none());

        assert_eq!(queue.recover().await, 1);
        let again = queue.try_receive().await.unwrap();
        assert_eq!(again.item, delivery.item);
    }

    #[tokio::test]
    async fn test_receive_waits_for_push() {
        let queue = Arc::new(MemoryQueue::new());
        let receiver = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.receive().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.push(&item("late")).await.unwrap();

        let delivery = tokio::time::timeout(Duration::from_secs(1), receiver)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(delivery.item.content, "late");
    }
}
