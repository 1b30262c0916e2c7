/**
 * PostgreSQL Work Queue
 *
 * Items live in the `work_queue` table until acknowledged. Receiving leases
 * a row by pushing its `visible_at` forward; a consumer that dies without
 * acking loses the lease and the row becomes visible again. Concurrent
 * consumers never lease the same row thanks to `FOR UPDATE SKIP LOCKED`.
 */

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::{Delivery, WorkQueue};
use crate::backend::error::BackendError;
use crate::shared::messaging::QueueItem;

/// How long a received row stays invisible to other consumers
pub const DEFAULT_LEASE: Duration = Duration::from_secs(60);

/// Sleep between polls of an empty queue
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct PgQueue {
    pool: PgPool,
    name: String,
    lease: Duration,
    poll_interval: Duration,
}

impl PgQueue {
    pub fn new(pool: PgPool, name: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
            lease: DEFAULT_LEASE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Lease the oldest visible row, if any
    async fn lease_next(&self) -> Result<Option<(i64, serde_json::Value, i32)>, BackendError> {
        let row = sqlx::query(
            r#"
            UPDATE work_queue
            SET visible_at = NOW() + make_interval(secs => $2), attempts = attempts + 1
            WHERE id = (
                SELECT id FROM work_queue
                WHERE queue_name = $1 AND visible_at <= NOW()
                ORDER BY id
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, payload, attempts
            "#,
        )
        .bind(&self.name)
        .bind(self.lease.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some((
                row.try_get("id")?,
                row.try_get("payload")?,
                row.try_get("attempts")?,
            ))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl WorkQueue for PgQueue {
    async fn push(&self, item: &QueueItem) -> Result<(), BackendError> {
        let payload = serde_json::to_value(item)?;
        sqlx::query("INSERT INTO work_queue (queue_name, payload) VALUES ($1, $2)")
            .bind(&self.name)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn receive(&self) -> Result<Delivery, BackendError> {
        loop {
            let Some((id, payload, attempts)) = self.lease_next().await? else {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            };

            match serde_json::from_value::<QueueItem>(payload) {
                Ok(item) => {
                    return Ok(Delivery {
                        tag: id as u64,
                        item,
                        attempts: attempts.max(0) as u32,
                    })
                }
                Err(e) => {
                    // Undecodable payloads can never succeed; drop them
                    tracing::error!("[Queue] Dropping malformed item {}: {}", id, e);
                    self.ack(id as u64).await?;
                }
            }
        }
    }

    async fn ack(&self, tag: u64) -> Result<(), BackendError> {
        sqlx::query("DELETE FROM work_queue WHERE id = $1")
            .bind(tag as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn nack(&self, tag: u64) -> Result<(), BackendError> {
        sqlx::query("UPDATE work_queue SET visible_at = NOW() WHERE id = $1")
            .bind(tag as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn pending(&self) -> Result<usize, BackendError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM work_queue WHERE queue_name = $1")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}
