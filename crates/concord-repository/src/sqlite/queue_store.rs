//! SQLite queue store.

use super::{from_nanos, to_count, to_nanos, to_total};
use crate::{traits::QueueStore, DatabasePoolInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concord_core::{ConcordError, ConcordResult, MessageId, MessageState, QueueMessageRecord};
use shaku::Component;
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;

/// Queue store over the `queue_messages` table.
#[derive(Component, Clone)]
#[shaku(interface = QueueStore)]
pub struct SqliteQueueStore {
    #[shaku(inject)]
    pool: Arc<dyn DatabasePoolInterface>,
}

impl SqliteQueueStore {
    /// Creates a new SQLite queue store.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a queue message.
#[derive(Debug, FromRow)]
struct QueueMessageRow {
    id: String,
    queue_name: String,
    payload: String,
    enqueued_at: i64,
    dequeued_at: Option<i64>,
    dequeue_count: i64,
    state: String,
    concurrency_token: i64,
}

impl TryFrom<QueueMessageRow> for QueueMessageRecord {
    type Error = ConcordError;

    fn try_from(row: QueueMessageRow) -> Result<Self, Self::Error> {
        let id = MessageId::parse(&row.id)
            .map_err(|e| ConcordError::Internal(format!("Invalid message id in database: {}", e)))?;

        Ok(QueueMessageRecord {
            id,
            queue_name: row.queue_name,
            payload: row.payload,
            enqueued_at: from_nanos(row.enqueued_at),
            dequeued_at: row.dequeued_at.map(from_nanos),
            dequeue_count: to_count(row.dequeue_count, "dequeue_count")?,
            state: row.state.parse()?,
            concurrency_token: row.concurrency_token,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, queue_name, payload, enqueued_at, dequeued_at,
           dequeue_count, state, concurrency_token
    FROM queue_messages
"#;

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn insert(&self, record: &QueueMessageRecord) -> ConcordResult<()> {
        debug!(queue = %record.queue_name, message_id = %record.id, "Inserting message");

        sqlx::query(
            r#"
            INSERT INTO queue_messages (id, queue_name, payload, enqueued_at, dequeued_at,
                                        dequeue_count, state, concurrency_token, enqueue_seq)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, (SELECT COALESCE(MAX(enqueue_seq), 0) + 1
                                             FROM queue_messages))
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.queue_name)
        .bind(&record.payload)
        .bind(to_nanos(record.enqueued_at))
        .bind(record.dequeued_at.map(to_nanos))
        .bind(i64::from(record.dequeue_count))
        .bind(record.state.as_str())
        .bind(record.concurrency_token)
        .execute(self.pool.inner())
        .await?;

        Ok(())
    }

    async fn upsert(
        &self,
        id: MessageId,
        queue_name: &str,
        payload: &str,
        state: MessageState,
        now: DateTime<Utc>,
    ) -> ConcordResult<()> {
        debug!(queue = %queue_name, message_id = %id, state = %state, "Re-enqueuing message");

        sqlx::query(
            r#"
            INSERT INTO queue_messages (id, queue_name, payload, enqueued_at, dequeue_count,
                                        state, concurrency_token, enqueue_seq)
            VALUES (?, ?, ?, ?, 0, ?, 0, (SELECT COALESCE(MAX(enqueue_seq), 0) + 1
                                          FROM queue_messages))
            ON CONFLICT(id) DO UPDATE
                SET queue_name = excluded.queue_name,
                    payload = excluded.payload,
                    enqueued_at = excluded.enqueued_at,
                    enqueue_seq = excluded.enqueue_seq,
                    state = excluded.state,
                    dequeue_count = queue_messages.dequeue_count + 1,
                    concurrency_token = queue_messages.concurrency_token + 1
            "#,
        )
        .bind(id.to_string())
        .bind(queue_name)
        .bind(payload)
        .bind(to_nanos(now))
        .bind(state.as_str())
        .execute(self.pool.inner())
        .await?;

        Ok(())
    }

    async fn find_oldest(
        &self,
        queue_name: &str,
        state: MessageState,
    ) -> ConcordResult<Option<QueueMessageRecord>> {
        let sql = format!(
            "{} WHERE queue_name = ? AND state = ? ORDER BY enqueued_at, enqueue_seq LIMIT 1",
            SELECT_COLUMNS
        );

        let row = sqlx::query_as::<_, QueueMessageRow>(&sql)
            .bind(queue_name)
            .bind(state.as_str())
            .fetch_optional(self.pool.inner())
            .await?;

        row.map(QueueMessageRecord::try_from).transpose()
    }

    async fn try_claim(
        &self,
        id: MessageId,
        expected_token: i64,
        expected_state: MessageState,
        now: DateTime<Utc>,
    ) -> ConcordResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE queue_messages
            SET state = ?,
                dequeue_count = dequeue_count + 1,
                concurrency_token = concurrency_token + 1,
                dequeued_at = ?
            WHERE id = ? AND concurrency_token = ? AND state = ?
            "#,
        )
        .bind(MessageState::Dequeued.as_str())
        .bind(to_nanos(now))
        .bind(id.to_string())
        .bind(expected_token)
        .bind(expected_state.as_str())
        .execute(self.pool.inner())
        .await?;

        let claimed = result.rows_affected() == 1;
        debug!(message_id = %id, token = expected_token, claimed, "Claim attempted");
        Ok(claimed)
    }

    async fn count(&self, queue_name: &str, state: MessageState) -> ConcordResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM queue_messages WHERE queue_name = ? AND state = ?",
        )
        .bind(queue_name)
        .bind(state.as_str())
        .fetch_one(self.pool.inner())
        .await?;

        to_total(count)
    }

    async fn find_by_id(&self, id: MessageId) -> ConcordResult<Option<QueueMessageRecord>> {
        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);

        let row = sqlx::query_as::<_, QueueMessageRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool.inner())
            .await?;

        row.map(QueueMessageRecord::try_from).transpose()
    }

    async fn relocate(
        &self,
        id: MessageId,
        queue_name: &str,
        state: MessageState,
    ) -> ConcordResult<bool> {
        debug!(message_id = %id, queue = %queue_name, state = %state, "Relocating message");

        let result = sqlx::query(
            r#"
            UPDATE queue_messages
            SET queue_name = ?, state = ?, concurrency_token = concurrency_token + 1
            WHERE id = ?
            "#,
        )
        .bind(queue_name)
        .bind(state.as_str())
        .bind(id.to_string())
        .execute(self.pool.inner())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: MessageId) -> ConcordResult<bool> {
        debug!(message_id = %id, "Deleting message");

        let result = sqlx::query("DELETE FROM queue_messages WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_dequeued(
        &self,
        queue_name: &str,
        older_than: DateTime<Utc>,
    ) -> ConcordResult<u64> {
        let result = sqlx::query(
            "DELETE FROM queue_messages WHERE queue_name = ? AND state = ? AND dequeued_at < ?",
        )
        .bind(queue_name)
        .bind(MessageState::Dequeued.as_str())
        .bind(to_nanos(older_than))
        .execute(self.pool.inner())
        .await?;

        debug!(queue = %queue_name, deleted = result.rows_affected(), "Purged claimed messages");
        Ok(result.rows_affected())
    }
}
