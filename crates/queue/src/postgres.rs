use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{DEFAULT_VISIBILITY_TIMEOUT, QueueError, QueueMessage, Result, queue::Queue};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Queue backed by the `queue_messages` table.
///
/// Receives claim rows with `FOR UPDATE SKIP LOCKED`, so concurrent consumers
/// never claim the same visible message. Long polling is emulated by
/// re-querying every `poll_interval` until the wait elapses.
#[derive(Clone)]
pub struct PostgresQueue {
    pool: PgPool,
    queue: String,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

impl PostgresQueue {
    /// Creates a handle to the named queue.
    pub fn new(pool: PgPool, queue: impl Into<String>) -> Self {
        Self {
            pool,
            queue: queue.into(),
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the visibility timeout applied to received messages.
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Sets how often an empty long poll re-checks the table.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn claim(&self, max: usize) -> Result<Vec<QueueMessage>> {
        let rows = sqlx::query(
            r#"
            UPDATE queue_messages
            SET receipt_handle = gen_random_uuid(),
                receive_count = receive_count + 1,
                visible_at = NOW() + make_interval(secs => $3)
            WHERE id IN (
                SELECT id FROM queue_messages
                WHERE queue = $1 AND visible_at <= NOW()
                ORDER BY created_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, body, receipt_handle, receive_count
            "#,
        )
        .bind(&self.queue)
        .bind(max as i64)
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<QueueMessage> {
                Ok(QueueMessage {
                    message_id: row.try_get::<Uuid, _>("id")?.to_string(),
                    body: row.try_get("body")?,
                    receipt_handle: row.try_get::<Uuid, _>("receipt_handle")?.to_string(),
                    receive_count: row.try_get::<i32, _>("receive_count")?.max(0) as u32,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Queue for PostgresQueue {
    async fn send(&self, body: String) -> Result<String> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO queue_messages (id, queue, body) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&self.queue)
            .bind(body)
            .execute(&self.pool)
            .await?;

        metrics::counter!("queue_messages_sent_total").increment(1);
        Ok(id.to_string())
    }

    async fn receive(&self, max: usize, wait: Duration) -> Result<Vec<QueueMessage>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + wait;
        loop {
            let batch = self.claim(max).await?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        let receipt = Uuid::parse_str(receipt_handle)
            .map_err(|_| QueueError::ReceiptNotFound(receipt_handle.to_string()))?;

        let result =
            sqlx::query("DELETE FROM queue_messages WHERE queue = $1 AND receipt_handle = $2")
                .bind(&self.queue)
                .bind(receipt)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(QueueError::ReceiptNotFound(receipt_handle.to_string()));
        }
        Ok(())
    }
}
