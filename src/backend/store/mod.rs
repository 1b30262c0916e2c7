//! Document Store
//!
//! Persistent records the engine reads and writes: users (activity only),
//! conversations, messages and scheduled auto-messages. Handlers and jobs
//! talk to the `DocumentStore` trait; the server picks PostgreSQL when
//! `DATABASE_URL` is set and the in-memory store otherwise.
//!
//! # Latches
//!
//! `mark_queued` and `mark_sent` are conditional updates ("set true only if
//! currently false") and report whether this call flipped the flag. They are
//! the only way those flags change.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::backend::error::BackendError;
use crate::shared::messaging::{
    AutoMessage, ChatMessage, Conversation, MessageView, UserRecord,
};

/// In-memory document store
pub mod memory;

/// PostgreSQL document store
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Default page size for conversation history
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Largest page size accepted for conversation history
pub const MAX_HISTORY_LIMIT: i64 = 200;

/// Store operations used by the messaging engine
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // Users

    /// Insert or replace a user record (account subsystem, fixtures)
    async fn upsert_user(&self, user: UserRecord) -> Result<(), BackendError>;

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, BackendError>;

    /// Number of distinct users among `user_ids` that exist
    async fn count_users(&self, user_ids: &[Uuid]) -> Result<usize, BackendError>;

    async fn find_active_users(&self) -> Result<Vec<UserRecord>, BackendError>;

    /// Set `is_active` and refresh `last_active_at`
    async fn mark_user_active(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BackendError>;

    /// Refresh `last_active_at` only
    async fn touch_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BackendError>;

    // Conversations

    /// The conversation, only if `user_id` is one of its participants
    async fn find_conversation_for_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>, BackendError>;

    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation, BackendError>;

    /// Two-party conversation containing exactly `a` and `b`
    async fn find_direct_conversation(&self, a: Uuid, b: Uuid) -> Result<Option<Conversation>, BackendError>;

    async fn set_last_message(&self, conversation_id: Uuid, message_id: Uuid) -> Result<(), BackendError>;

    // Messages

    async fn create_message(&self, message: ChatMessage) -> Result<ChatMessage, BackendError>;

    async fn find_message_view(&self, message_id: Uuid) -> Result<Option<MessageView>, BackendError>;

    /// Add `user_id` to the read set of a message in `conversation_id`
    ///
    /// Returns `false` when no such message exists. Adding an existing
    /// reader is a no-op that still returns `true`.
    async fn add_reader(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, BackendError>;

    /// The message materialized from an auto-message, if any
    async fn find_message_by_source(&self, auto_message_id: Uuid) -> Result<Option<ChatMessage>, BackendError>;

    /// Messages oldest first, at most `limit`, created strictly before `before`
    async fn messages_for_conversation(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageView>, BackendError>;

    // Auto-messages

    async fn create_auto_message(&self, auto_message: AutoMessage) -> Result<AutoMessage, BackendError>;

    /// Auto-messages with `send_date <= now` that are not yet queued
    async fn due_auto_messages(&self, now: DateTime<Utc>) -> Result<Vec<AutoMessage>, BackendError>;

    async fn find_auto_message(&self, auto_message_id: Uuid) -> Result<Option<AutoMessage>, BackendError>;

    /// Flip `is_queued` if it is false; returns whether it flipped
    async fn mark_queued(&self, auto_message_id: Uuid) -> Result<bool, BackendError>;

    /// Flip `is_sent` if it is false; returns whether it flipped
    async fn mark_sent(&self, auto_message_id: Uuid) -> Result<bool, BackendError>;
}

/// Clamp a requested history page size
pub fn history_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}
