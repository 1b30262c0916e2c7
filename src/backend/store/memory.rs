/**
 * In-memory Document Store
 *
 * Keeps every record behind one `RwLock` so the conditional updates
 * (`add_reader`, `mark_queued`, `mark_sent`) check and write under the same
 * guard. Used when no database is configured and throughout the tests.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::DocumentStore;
use crate::backend::error::BackendError;
use crate::shared::messaging::{
    AutoMessage, ChatMessage, Conversation, MessageView, UserRecord, UserSummary,
};

#[derive(Default)]
struct Documents {
    users: HashMap<Uuid, UserRecord>,
    conversations: HashMap<Uuid, Conversation>,
    /// Insertion order doubles as creation order
    messages: Vec<ChatMessage>,
    auto_messages: HashMap<Uuid, AutoMessage>,
}

impl Documents {
    fn sender_summary(&self, sender_id: Uuid) -> UserSummary {
        self.users
            .get(&sender_id)
            .map(UserRecord::summary)
            .unwrap_or(UserSummary {
                id: sender_id,
                username: String::new(),
            })
    }

    fn view(&self, message: &ChatMessage) -> MessageView {
        message.clone().into_view(self.sender_summary(message.sender_id))
    }
}

/// Document store held entirely in process memory
#[derive(Default)]
pub struct MemoryStore {
    docs: RwLock<Documents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert_user(&self, user: UserRecord) -> Result<(), BackendError> {
        self.docs.write().await.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, BackendError> {
        Ok(self.docs.read().await.users.get(&user_id).cloned())
    }

    async fn count_users(&self, user_ids: &[Uuid]) -> Result<usize, BackendError> {
        let docs = self.docs.read().await;
        let distinct: HashSet<&Uuid> = user_ids.iter().collect();
        Ok(distinct.into_iter().filter(|id| docs.users.contains_key(id)).count())
    }

    async fn find_active_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        let docs = self.docs.read().await;
        let mut users: Vec<UserRecord> = docs.users.values().filter(|u| u.is_active).cloned().collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn mark_user_active(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BackendError> {
        if let Some(user) = self.docs.write().await.users.get_mut(&user_id) {
            user.is_active = true;
            user.last_active_at = Some(at);
        }
        Ok(())
    }

    async fn touch_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BackendError> {
        if let Some(user) = self.docs.write().await.users.get_mut(&user_id) {
            user.last_active_at = Some(at);
        }
        Ok(())
    }

    async fn find_conversation_for_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>, BackendError> {
        Ok(self
            .docs
            .read()
            .await
            .conversations
            .get(&conversation_id)
            .filter(|c| c.has_participant(user_id))
            .cloned())
    }

    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation, BackendError> {
        self.docs
            .write()
            .await
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_direct_conversation(&self, a: Uuid, b: Uuid) -> Result<Option<Conversation>, BackendError> {
        let docs = self.docs.read().await;
        Ok(docs
            .conversations
            .values()
            .filter(|c| c.is_direct_between(a, b))
            .min_by_key(|c| c.created_at)
            .cloned())
    }

    async fn set_last_message(&self, conversation_id: Uuid, message_id: Uuid) -> Result<(), BackendError> {
        let mut docs = self.docs.write().await;
        let conversation = docs
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| BackendError::not_found("Conversation not found"))?;
        conversation.last_message_id = Some(message_id);
        conversation.updated_at = Utc::now();
        Ok(())
    }

    async fn create_message(&self, message: ChatMessage) -> Result<ChatMessage, BackendError> {
        let mut docs = self.docs.write().await;
        if let Some(source) = message.source_auto_message {
            if docs.messages.iter().any(|m| m.source_auto_message == Some(source)) {
                return Err(BackendError::infrastructure(
                    "Message for this auto-message already exists",
                ));
            }
        }
        docs.messages.push(message.clone());
        Ok(message)
    }

    async fn find_message_view(&self, message_id: Uuid) -> Result<Option<MessageView>, BackendError> {
        let docs = self.docs.read().await;
        Ok(docs
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .map(|m| docs.view(m)))
    }

    async fn add_reader(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, BackendError> {
        let mut docs = self.docs.write().await;
        match docs
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.conversation_id == conversation_id)
        {
            Some(message) => {
                message.mark_read_by(user_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_message_by_source(&self, auto_message_id: Uuid) -> Result<Option<ChatMessage>, BackendError> {
        Ok(self
            .docs
            .read()
            .await
            .messages
            .iter()
            .find(|m| m.source_auto_message == Some(auto_message_id))
            .cloned())
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageView>, BackendError> {
        let docs = self.docs.read().await;
        let matching: Vec<&ChatMessage> = docs
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .filter(|m| before.map_or(true, |cutoff| m.created_at < cutoff))
            .collect();

        let skip = matching.len().saturating_sub(limit.max(0) as usize);
        Ok(matching[skip..].iter().map(|m| docs.view(m)).collect())
    }

    async fn create_auto_message(&self, auto_message: AutoMessage) -> Result<AutoMessage, BackendError> {
        self.docs
            .write()
            .await
            .auto_messages
            .insert(auto_message.id, auto_message.clone());
        Ok(auto_message)
    }

    async fn due_auto_messages(&self, now: DateTime<Utc>) -> Result<Vec<AutoMessage>, BackendError> {
        let docs = self.docs.read().await;
        let mut due: Vec<AutoMessage> = docs
            .auto_messages
            .values()
            .filter(|a| a.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|a| a.send_date);
        Ok(due)
    }

    async fn find_auto_message(&self, auto_message_id: Uuid) -> Result<Option<AutoMessage>, BackendError> {
        Ok(self.docs.read().await.auto_messages.get(&auto_message_id).cloned())
    }

    async fn mark_queued(&self, auto_message_id: Uuid) -> Result<bool, BackendError> {
        let mut docs = self.docs.write().await;
        Ok(match docs.auto_messages.get_mut(&auto_message_id) {
            Some(auto) if !auto.is_queued => {
                auto.is_queued = true;
                true
            }
            _ => false,
        })
    }

    async fn mark_sent(&self, auto_message_id: Uuid) -> Result<bool, BackendError> {
        let mut docs = self.docs.write().await;
        Ok(match docs.auto_messages.get_mut(&auto_message_id) {
            Some(auto) if !auto.is_sent => {
                auto.is_sent = true;
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    async fn seeded() -> (MemoryStore, UserRecord, UserRecord) {
        let store = MemoryStore::new();
        let alice = UserRecord::new("alice");
        let bob = UserRecord::new("bob");
        store.upsert_user(alice.clone()).await.unwrap();
        store.upsert_user(bob.clone()).await.unwrap();
        (store, alice, bob)
    }

    #[tokio::test]
    async fn test_count_users_ignores_duplicates_and_unknown() {
        let (store, alice, bob) = seeded().await;
        let ids = [alice.id, bob.id, alice.id, Uuid::new_v4()];
        assert_eq!(store.count_users(&ids).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_conversation_visible_to_participants_only() {
        let (store, alice, bob) = seeded().await;
        let conversation = store
            .create_conversation(Conversation::new(vec![alice.id, bob.id]))
            .await
            .unwrap();

        assert!(store
            .find_conversation_for_participant(conversation.id, bob.id)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_conversation_for_participant(conversation.id, Uuid::new_v4())
            .await
            .unwrap()
            .is_none());
        assert_eq!(
            store.find_direct_conversation(bob.id, alice.id).await.unwrap().map(|c| c.id),
            Some(conversation.id)
        );
    }

    #[tokio::test]
    async fn test_add_reader_is_idempotent() {
        let (store, alice, bob) = seeded().await;
        let conversation = Conversation::new(vec![alice.id, bob.id]);
        let message = ChatMessage::new(conversation.id, alice.id, "hi".into());
        store.create_message(message.clone()).await.unwrap();

        assert!(store.add_reader(conversation.id, message.id, bob.id).await.unwrap());
        assert!(store.add_reader(conversation.id, message.id, bob.id).await.unwrap());
        let view = store.find_message_view(message.id).await.unwrap().unwrap();
        assert_eq!(view.read_by, vec![alice.id, bob.id]);
        assert_eq!(view.sender.username, "alice");

        assert!(!store.add_reader(conversation.id, Uuid::new_v4(), bob.id).await.unwrap());
        assert!(!store.add_reader(Uuid::new_v4(), message.id, bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_latches_flip_once() {
        let (store, alice, bob) = seeded().await;
        let auto = AutoMessage::new(alice.id, bob.id, "hi".into(), Utc::now() - Duration::minutes(5));
        store.create_auto_message(auto.clone()).await.unwrap();

        assert_eq!(store.due_auto_messages(Utc::now()).await.unwrap().len(), 1);
        assert!(store.mark_queued(auto.id).await.unwrap());
        assert!(!store.mark_queued(auto.id).await.unwrap());
        assert!(store.due_auto_messages(Utc::now()).await.unwrap().is_empty());

        assert!(store.mark_sent(auto.id).await.unwrap());
        assert!(!store.mark_sent(auto.id).await.unwrap());
        assert!(!store.mark_sent(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_history_returns_latest_page_oldest_first() {
        let (store, alice, bob) = seeded().await;
        let conversation_id = Uuid::new_v4();
        let base = Utc::now() - Duration::hours(1);
        for i in 0..5 {
            let mut message = ChatMessage::new(conversation_id, alice.id, format!("m{}", i));
            message.created_at = base + Duration::minutes(i);
            store.create_message(message).await.unwrap();
        }
        store
            .create_message(ChatMessage::new(Uuid::new_v4(), bob.id, "elsewhere".into()))
            .await
            .unwrap();

        let page = store.messages_for_conversation(conversation_id, 3, None).await.unwrap();
        let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);

        let before = base + Duration::minutes(2);
        let page = store
            .messages_for_conversation(conversation_id, 50, Some(before))
            .await
            .unwrap();
        let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1"]);
    }

    #[tokio::test]
    async fn test_source_auto_message_is_unique() {
        let (store, alice, _) = seeded().await;
        let auto_id = Uuid::new_v4();
        let conversation_id = Uuid::new_v4();
        store
            .create_message(ChatMessage::new(conversation_id, alice.id, "x".into()).from_auto_message(auto_id))
            .await
            .unwrap();
        assert!(store
            .create_message(ChatMessage::new(conversation_id, alice.id, "x".into()).from_auto_message(auto_id))
            .await
            .is_err());
        assert!(store.find_message_by_source(auto_id).await.unwrap().is_some());
    }
}
