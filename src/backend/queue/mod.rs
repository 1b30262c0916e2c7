//! Durable Work Queue
//!
//! At-least-once channel between the enqueue job and the queue consumer.
//! A received item stays owned by the receiver until it is acknowledged;
//! a negative acknowledgement (or a lease that runs out) makes it
//! deliverable again.

use async_trait::async_trait;

use crate::backend::error::BackendError;
use crate::shared::messaging::QueueItem;

/// In-memory queue
pub mod memory;

/// PostgreSQL-backed queue
pub mod postgres;

pub use memory::MemoryQueue;
pub use postgres::PgQueue;

/// Default queue name
pub const DEFAULT_QUEUE_NAME: &str = "auto_messages";

/// An item handed to a consumer, identified by its delivery tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub tag: u64,
    pub item: QueueItem,
    /// How many times this item has been handed out, this one included
    pub attempts: u32,
}

#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Persist an item; returns once the queue has accepted it
    async fn push(&self, item: &QueueItem) -> Result<(), BackendError>;

    /// Wait for the next deliverable item
    async fn receive(&self) -> Result<Delivery, BackendError>;

    /// Remove a delivered item for good
    async fn ack(&self, tag: u64) -> Result<(), BackendError>;

    /// Return a delivered item to the queue for redelivery
    async fn nack(&self, tag: u64) -> Result<(), BackendError>;

    /// Items not yet acknowledged, in flight or waiting
    async fn pending(&self) -> Result<usize, BackendError>;
}
