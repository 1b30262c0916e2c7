//! In-memory presence store
//!
//! Typing markers carry a `tokio::time::Instant` deadline and are treated
//! as absent once it passes, so paused-clock tests can observe expiry.
//! Expired markers are evicted whenever a new one is written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use super::PresenceStore;
use crate::backend::error::BackendError;

#[derive(Default)]
pub struct MemoryPresence {
    /// user → live session count; present only while above zero
    sessions: DashMap<Uuid, u64>,
    sockets: DashMap<Uuid, Uuid>,
    room_members: DashMap<Uuid, HashSet<Uuid>>,
    user_rooms: DashMap<Uuid, HashMap<Uuid, DateTime<Utc>>>,
    /// (user, conversation) → expiry
    typing: DashMap<(Uuid, Uuid), Instant>,
}

impl MemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop typing markers whose deadline has passed
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.typing.retain(|_, expires| *expires > now);
    }
}

#[async_trait]
impl PresenceStore for MemoryPresence {
    async fn add_online(&self, user_id: Uuid) -> Result<u64, BackendError> {
        let mut count = self.sessions.entry(user_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn remove_online(&self, user_id: Uuid) -> Result<u64, BackendError> {
        match self.sessions.entry(user_id) {
            Entry::Occupied(mut entry) => {
                let remaining = entry.get().saturating_sub(1);
                if remaining == 0 {
                    entry.remove();
                } else {
                    *entry.get_mut() = remaining;
                }
                Ok(remaining)
            }
            Entry::Vacant(_) => Ok(0),
        }
    }

    async fn is_online(&self, user_id: Uuid) -> Result<bool, BackendError> {
        Ok(self.sessions.contains_key(&user_id))
    }

    async fn online_users(&self) -> Result<Vec<Uuid>, BackendError> {
        let mut users: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        users.sort();
        Ok(users)
    }

    async fn set_user_socket(&self, user_id: Uuid, connection_id: Uuid) -> Result<(), BackendError> {
        self.sockets.insert(user_id, connection_id);
        Ok(())
    }

    async fn clear_user_socket(&self, user_id: Uuid) -> Result<(), BackendError> {
        self.sockets.remove(&user_id);
        Ok(())
    }

    async fn user_socket(&self, user_id: Uuid) -> Result<Option<Uuid>, BackendError> {
        Ok(self.sockets.get(&user_id).map(|entry| *entry))
    }

    async fn join_room(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        self.room_members
            .entry(conversation_id)
            .or_default()
            .insert(user_id);
        self.user_rooms
            .entry(user_id)
            .or_default()
            .insert(conversation_id, at);
        Ok(())
    }

    async fn room_members(&self, conversation_id: Uuid) -> Result<Vec<Uuid>, BackendError> {
        let mut members: Vec<Uuid> = self
            .room_members
            .get(&conversation_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        members.sort();
        Ok(members)
    }

    async fn joined_at(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, BackendError> {
        Ok(self
            .user_rooms
            .get(&user_id)
            .and_then(|rooms| rooms.get(&conversation_id).copied()))
    }

    async fn set_typing(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        ttl: Duration,
    ) -> Result<(), BackendError> {
        self.purge_expired();
        self.typing
            .insert((user_id, conversation_id), Instant::now() + ttl);
        Ok(())
    }

    async fn clear_typing(&self, user_id: Uuid, conversation_id: Uuid) -> Result<(), BackendError> {
        self.typing.remove(&(user_id, conversation_id));
        Ok(())
    }

    async fn is_typing(&self, user_id: Uuid, conversation_id: Uuid) -> Result<bool, BackendError> {
        Ok(self
            .typing
            .get(&(user_id, conversation_id))
            .map(|expires| *expires > Instant::now())
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::presence::TYPING_TTL;

    #[tokio::test]
    async fn test_online_set() {
        let presence = MemoryPresence::new();
        let user = Uuid::new_v4();
        assert_eq!(presence.add_online(user).await.unwrap(), 1);
        assert_eq!(presence.add_online(user).await.unwrap(), 2);
        assert!(presence.is_online(user).await.unwrap());
        assert_eq!(presence.online_users().await.unwrap(), vec![user]);

        assert_eq!(presence.remove_online(user).await.unwrap(), 1);
        assert!(presence.is_online(user).await.unwrap());
        assert_eq!(presence.remove_online(user).await.unwrap(), 0);
        assert!(!presence.is_online(user).await.unwrap());
        assert_eq!(presence.remove_online(user).await.unwrap(), 0);
        assert!(presence.online_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_room_records_both_directions() {
        let presence = MemoryPresence::new();
        let (user, conversation) = (Uuid::new_v4(), Uuid::new_v4());
        let at = Utc::now();
        presence.join_room(conversation, user, at).await.unwrap();

        assert_eq!(presence.room_members(conversation).await.unwrap(), vec![user]);
        assert_eq!(presence.joined_at(user, conversation).await.unwrap(), Some(at));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_marker_expires() {
        let presence = MemoryPresence::new();
        let (user, conversation) = (Uuid::new_v4(), Uuid::new_v4());
        presence.set_typing(user, conversation, TYPING_TTL).await.unwrap();
        assert!(presence.is_typing(user, conversation).await.unwrap());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(!presence.is_typing(user, conversation).await.unwrap());

        presence.purge_expired();
        assert!(presence.typing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_markers_are_evicted_on_write() {
        let presence = MemoryPresence::new();
        let conversation = Uuid::new_v4();
        for _ in 0..1000 {
            presence
                .set_typing(Uuid::new_v4(), conversation, TYPING_TTL)
                .await
                .unwrap();
        }
        assert_eq!(presence.typing.len(), 1000);

        tokio::time::advance(Duration::from_secs(60)).await;
        let (user, other) = (Uuid::new_v4(), Uuid::new_v4());
        presence.set_typing(user, other, TYPING_TTL).await.unwrap();

        assert_eq!(presence.typing.len(), 1);
        assert!(presence.is_typing(user, other).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_typing() {
        let presence = MemoryPresence::new();
        let (user, conversation) = (Uuid::new_v4(), Uuid::new_v4());
        presence.set_typing(user, conversation, TYPING_TTL).await.unwrap();
        presence.clear_typing(user, conversation).await.unwrap();
        assert!(!presence.is_typing(user, conversation).await.unwrap());
    }
}
