//! Presence Store
//!
//! Shared, ephemeral state about who is connected and where:
//!
//! - the online set, with a live-session count per user
//! - the user → connection mapping
//! - per-conversation member sets and per-user join timestamps
//! - typing markers with a short expiry
//!
//! Every mutation is a single set/hash/TTL operation so concurrent sessions
//! never race on a read-modify-write. The Redis backend uses the key layout
//! below; the in-memory backend mirrors it with `dashmap`.
//!
//! | Key | Type |
//! |-----|------|
//! | `online_users` | set of user ids |
//! | `user_sessions` | hash user id → live session count |
//! | `user_sockets` | hash user id → connection id |
//! | `conversation:{id}:members` | set of user ids |
//! | `user:{id}:conversations` | hash conversation id → RFC 3339 join time |
//! | `typing:{user}:{conversation}` | string with 5 s expiry |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::backend::error::BackendError;

/// In-memory presence store
pub mod memory;

/// Redis presence store
pub mod redis;

pub use self::memory::MemoryPresence;
pub use self::redis::RedisPresence;

/// How long a typing marker survives without a `typing_stop`
pub const TYPING_TTL: Duration = Duration::from_secs(5);

pub const ONLINE_USERS_KEY: &str = "online_users";
pub const USER_SOCKETS_KEY: &str = "user_sockets";
pub const USER_SESSIONS_KEY: &str = "user_sessions";

pub fn room_members_key(conversation_id: Uuid) -> String {
    format!("conversation:{}:members", conversation_id)
}

pub fn user_rooms_key(user_id: Uuid) -> String {
    format!("user:{}:conversations", user_id)
}

pub fn typing_key(user_id: Uuid, conversation_id: Uuid) -> String {
    format!("typing:{}:{}", user_id, conversation_id)
}

/// Presence operations used by sessions and the queue consumer
#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// Count one more live session and mark the user online
    ///
    /// # Returns
    ///
    /// The user's live session count after the increment; `1` means the
    /// user just came online
    async fn add_online(&self, user_id: Uuid) -> Result<u64, BackendError>;

    /// Count one session fewer; the user leaves the online set at zero
    ///
    /// # Returns
    ///
    /// Sessions the user still has open
    async fn remove_online(&self, user_id: Uuid) -> Result<u64, BackendError>;

    async fn is_online(&self, user_id: Uuid) -> Result<bool, BackendError>;

    async fn online_users(&self) -> Result<Vec<Uuid>, BackendError>;

    async fn set_user_socket(&self, user_id: Uuid, connection_id: Uuid) -> Result<(), BackendError>;

    async fn clear_user_socket(&self, user_id: Uuid) -> Result<(), BackendError>;

    async fn user_socket(&self, user_id: Uuid) -> Result<Option<Uuid>, BackendError>;

    /// Record membership in both directions as one atomic step
    async fn join_room(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), BackendError>;

    async fn room_members(&self, conversation_id: Uuid) -> Result<Vec<Uuid>, BackendError>;

    /// When `user_id` last joined `conversation_id`
    async fn joined_at(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, BackendError>;

    async fn set_typing(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        ttl: Duration,
    ) -> Result<(), BackendError>;

    async fn clear_typing(&self, user_id: Uuid, conversation_id: Uuid) -> Result<(), BackendError>;

    async fn is_typing(&self, user_id: Uuid, conversation_id: Uuid) -> Result<bool, BackendError>;
}
