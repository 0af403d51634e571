//! SQLite scheduled task store.

use super::{from_nanos, to_count, to_nanos};
use crate::{traits::ScheduledTaskStore, DatabasePoolInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concord_core::{ConcordError, ConcordResult, ScheduledTaskRecord, TaskStatus};
use shaku::Component;
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;

/// Scheduled task store over the `scheduled_tasks` table.
#[derive(Component, Clone)]
#[shaku(interface = ScheduledTaskStore)]
pub struct SqliteScheduledTaskStore {
    #[shaku(inject)]
    pool: Arc<dyn DatabasePoolInterface>,
}

impl SqliteScheduledTaskStore {
    /// Creates a new SQLite scheduled task store.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a scheduled task.
#[derive(Debug, FromRow)]
struct ScheduledTaskRow {
    id: String,
    worker_id: Option<String>,
    task_group: Option<String>,
    description: Option<String>,
    task_type: String,
    last_execution: Option<i64>,
    next_execution: Option<i64>,
    execution_count: i64,
    status: String,
    errors: Option<String>,
    payload: Option<String>,
    progress: f64,
}

impl TryFrom<ScheduledTaskRow> for ScheduledTaskRecord {
    type Error = ConcordError;

    fn try_from(row: ScheduledTaskRow) -> Result<Self, Self::Error> {
        Ok(ScheduledTaskRecord {
            id: row.id,
            worker_id: row.worker_id,
            group: row.task_group,
            description: row.description,
            task_type: row.task_type,
            last_execution: row.last_execution.map(from_nanos),
            next_execution: row.next_execution.map(from_nanos),
            execution_count: to_count(row.execution_count, "execution_count")?,
            status: row.status.parse()?,
            errors: row.errors,
            payload: row.payload,
            progress: row.progress,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, worker_id, task_group, description, task_type, last_execution,
           next_execution, execution_count, status, errors, payload, progress
    FROM scheduled_tasks
"#;

#[async_trait]
impl ScheduledTaskStore for SqliteScheduledTaskStore {
    async fn find_by_id(&self, id: &str) -> ConcordResult<Option<ScheduledTaskRecord>> {
        debug!("Finding scheduled task by id: {}", id);

        let sql = format!("{} WHERE id = ?", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, ScheduledTaskRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool.inner())
            .await?;

        row.map(ScheduledTaskRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &ScheduledTaskRecord) -> ConcordResult<()> {
        debug!(task_id = %record.id, status = %record.status, "Saving scheduled task");

        sqlx::query(
            r#"
            INSERT INTO scheduled_tasks (id, worker_id, task_group, description, task_type,
                                         last_execution, next_execution, execution_count,
                                         status, errors, payload, progress)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE
                SET worker_id = excluded.worker_id,
                    task_group = excluded.task_group,
                    description = excluded.description,
                    task_type = excluded.task_type,
                    last_execution = excluded.last_execution,
                    next_execution = excluded.next_execution,
                    execution_count = excluded.execution_count,
                    status = excluded.status,
                    errors = excluded.errors,
                    payload = excluded.payload,
                    progress = excluded.progress
            "#,
        )
        .bind(&record.id)
        .bind(&record.worker_id)
        .bind(&record.group)
        .bind(&record.description)
        .bind(&record.task_type)
        .bind(record.last_execution.map(to_nanos))
        .bind(record.next_execution.map(to_nanos))
        .bind(i64::from(record.execution_count))
        .bind(record.status.as_str())
        .bind(&record.errors)
        .bind(&record.payload)
        .bind(record.progress)
        .execute(self.pool.inner())
        .await?;

        Ok(())
    }

    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> ConcordResult<Vec<ScheduledTaskRecord>> {
        let sql = format!(
            "{} WHERE next_execution IS NOT NULL AND next_execution <= ? AND status != ? \
             ORDER BY next_execution, id LIMIT ?",
            SELECT_COLUMNS
        );

        let rows = sqlx::query_as::<_, ScheduledTaskRow>(&sql)
            .bind(to_nanos(now))
            .bind(TaskStatus::Running.as_str())
            .bind(i64::from(limit))
            .fetch_all(self.pool.inner())
            .await?;

        rows.into_iter().map(ScheduledTaskRecord::try_from).collect()
    }

    async fn delete(&self, id: &str) -> ConcordResult<bool> {
        debug!("Deleting scheduled task: {}", id);

        let result = sqlx::query("DELETE FROM scheduled_tasks WHERE id = ?")
            .bind(id)
            .execute(self.pool.inner())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
