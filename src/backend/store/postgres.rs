//! PostgreSQL document store
//!
//! Runtime-checked `sqlx` queries against the schema in `migrations/`.
//! Participants and read sets are `uuid[]` columns; set-union and latch
//! updates are single conditional statements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::DocumentStore;
use crate::backend::error::BackendError;
use crate::shared::messaging::{
    AutoMessage, ChatMessage, Conversation, MessageView, UserRecord, UserRole, UserSummary,
};

/// Document store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MESSAGE_VIEW_COLUMNS: &str = r#"
    m.id, m.conversation_id, m.sender_id, m.content, m.read_by, m.created_at,
    COALESCE(u.username, '') AS sender_username
"#;

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        role: UserRole::parse(row.try_get::<String, _>("role")?.as_str()),
        is_active: row.try_get("is_active")?,
        last_active_at: row.try_get("last_active_at")?,
    })
}

fn conversation_from_row(row: &PgRow) -> Result<Conversation, sqlx::Error> {
    Ok(Conversation {
        id: row.try_get("id")?,
        participants: row.try_get("participants")?,
        last_message_id: row.try_get("last_message_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<ChatMessage, sqlx::Error> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        read_by: row.try_get("read_by")?,
        source_auto_message: row.try_get("source_auto_message")?,
        created_at: row.try_get("created_at")?,
    })
}

fn message_view_from_row(row: &PgRow) -> Result<MessageView, sqlx::Error> {
    Ok(MessageView {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender: UserSummary {
            id: row.try_get("sender_id")?,
            username: row.try_get("sender_username")?,
        },
        content: row.try_get("content")?,
        read_by: row.try_get("read_by")?,
        created_at: row.try_get("created_at")?,
    })
}

fn auto_message_from_row(row: &PgRow) -> Result<AutoMessage, sqlx::Error> {
    Ok(AutoMessage {
        id: row.try_get("id")?,
        sender_id: row.try_get("sender_id")?,
        receiver_id: row.try_get("receiver_id")?,
        content: row.try_get("content")?,
        send_date: row.try_get("send_date")?,
        is_queued: row.try_get("is_queued")?,
        is_sent: row.try_get("is_sent")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn upsert_user(&self, user: UserRecord) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, role, is_active, last_active_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username, role = EXCLUDED.role,
                is_active = EXCLUDED.is_active, last_active_at = EXCLUDED.last_active_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.last_active_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<UserRecord>, BackendError> {
        let row = sqlx::query(
            "SELECT id, username, role, is_active, last_active_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn count_users(&self, user_ids: &[Uuid]) -> Result<usize, BackendError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ANY($1)")
            .bind(user_ids)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }

    async fn find_active_users(&self) -> Result<Vec<UserRecord>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, role, is_active, last_active_at
            FROM users
            WHERE is_active = TRUE
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    async fn mark_user_active(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BackendError> {
        sqlx::query("UPDATE users SET is_active = TRUE, last_active_at = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn touch_user(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<(), BackendError> {
        sqlx::query("UPDATE users SET last_active_at = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_conversation_for_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>, BackendError> {
        let row = sqlx::query(
            r#"
            SELECT id, participants, last_message_id, created_at, updated_at
            FROM conversations
            WHERE id = $1 AND $2 = ANY(participants)
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(conversation_from_row).transpose()?)
    }

    async fn create_conversation(&self, conversation: Conversation) -> Result<Conversation, BackendError> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, participants, last_message_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(conversation.id)
        .bind(&conversation.participants)
        .bind(conversation.last_message_id)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(conversation)
    }

    async fn find_direct_conversation(&self, a: Uuid, b: Uuid) -> Result<Option<Conversation>, BackendError> {
        let row = sqlx::query(
            r#"
            SELECT id, participants, last_message_id, created_at, updated_at
            FROM conversations
            WHERE participants @> ARRAY[$1, $2]::uuid[] AND cardinality(participants) = 2
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(conversation_from_row).transpose()?)
    }

    async fn set_last_message(&self, conversation_id: Uuid, message_id: Uuid) -> Result<(), BackendError> {
        let result = sqlx::query(
            "UPDATE conversations SET last_message_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(conversation_id)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BackendError::not_found("Conversation not found"));
        }
        Ok(())
    }

    async fn create_message(&self, message: ChatMessage) -> Result<ChatMessage, BackendError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, read_by, source_auto_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(&message.read_by)
        .bind(message.source_auto_message)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(message)
    }

    async fn find_message_view(&self, message_id: Uuid) -> Result<Option<MessageView>, BackendError> {
        let query = format!(
            "SELECT {} FROM messages m LEFT JOIN users u ON u.id = m.sender_id WHERE m.id = $1",
            MESSAGE_VIEW_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(message_view_from_row).transpose()?)
    }

    async fn add_reader(
        &self,
        conversation_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, BackendError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET read_by = CASE WHEN $3 = ANY(read_by) THEN read_by ELSE array_append(read_by, $3) END
            WHERE id = $1 AND conversation_id = $2
            "#,
        )
        .bind(message_id)
        .bind(conversation_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_message_by_source(&self, auto_message_id: Uuid) -> Result<Option<ChatMessage>, BackendError> {
        let row = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, content, read_by, source_auto_message, created_at
            FROM messages
            WHERE source_auto_message = $1
            "#,
        )
        .bind(auto_message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(message_from_row).transpose()?)
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: Uuid,
        limit: i64,
        before: Option<DateTime<Utc>>,
    ) -> Result<Vec<MessageView>, BackendError> {
        // Newest page first, then flipped to oldest first
        let query = format!(
            r#"
            SELECT * FROM (
                SELECT {}
                FROM messages m LEFT JOIN users u ON u.id = m.sender_id
                WHERE m.conversation_id = $1 AND ($2::timestamptz IS NULL OR m.created_at < $2)
                ORDER BY m.created_at DESC
                LIMIT $3
            ) page
            ORDER BY created_at ASC
            "#,
            MESSAGE_VIEW_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(conversation_id)
            .bind(before)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(message_view_from_row).collect::<Result<_, _>>()?)
    }

    async fn create_auto_message(&self, auto_message: AutoMessage) -> Result<AutoMessage, BackendError> {
        sqlx::query(
            r#"
            INSERT INTO auto_messages (id, sender_id, receiver_id, content, send_date, is_queued, is_sent, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(auto_message.id)
        .bind(auto_message.sender_id)
        .bind(auto_message.receiver_id)
        .bind(&auto_message.content)
        .bind(auto_message.send_date)
        .bind(auto_message.is_queued)
        .bind(auto_message.is_sent)
        .bind(auto_message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(auto_message)
    }

    async fn due_auto_messages(&self, now: DateTime<Utc>) -> Result<Vec<AutoMessage>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, content, send_date, is_queued, is_sent, created_at
            FROM auto_messages
            WHERE send_date <= $1 AND is_queued = FALSE
            ORDER BY send_date
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(auto_message_from_row).collect::<Result<_, _>>()?)
    }

    async fn find_auto_message(&self, auto_message_id: Uuid) -> Result<Option<AutoMessage>, BackendError> {
        let row = sqlx::query(
            r#"
            SELECT id, sender_id, receiver_id, content, send_date, is_queued, is_sent, created_at
            FROM auto_messages
            WHERE id = $1
            "#,
        )
        .bind(auto_message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(auto_message_from_row).transpose()?)
    }

    async fn mark_queued(&self, auto_message_id: Uuid) -> Result<bool, BackendError> {
        let result = sqlx::query("UPDATE auto_messages SET is_queued = TRUE WHERE id = $1 AND is_queued = FALSE")
            .bind(auto_message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_sent(&self, auto_message_id: Uuid) -> Result<bool, BackendError> {
        let result = sqlx::query("UPDATE auto_messages SET is_sent = TRUE WHERE id = $1 AND is_sent = FALSE")
            .bind(auto_message_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
