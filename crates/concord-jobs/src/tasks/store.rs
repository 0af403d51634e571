//! Typed scheduled task store.

use super::descriptor::ScheduledTaskDescriptor;
use crate::metrics::TaskMetrics;
use crate::serializer::{JsonSerializer, PayloadSerializer};
use chrono::{DateTime, Utc};
use concord_core::ConcordResult;
use concord_repository::ScheduledTaskStore;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Reads and writes [`ScheduledTaskDescriptor`]s with state of type `TState`.
///
/// `save` is a full overwrite by id: concurrent saves of the same task are
/// last-writer-wins. Serialize writes per task through a lock when that
/// matters.
pub struct TaskDescriptorStore<TState, S = JsonSerializer> {
    store: Arc<dyn ScheduledTaskStore>,
    serializer: S,
    _state: PhantomData<fn() -> TState>,
}

impl<TState> TaskDescriptorStore<TState, JsonSerializer> {
    /// Creates a store with JSON state.
    #[must_use]
    pub fn new(store: Arc<dyn ScheduledTaskStore>) -> Self {
        Self::with_serializer(store, JsonSerializer)
    }
}

impl<TState, S> TaskDescriptorStore<TState, S> {
    /// Creates a store with a custom serializer.
    #[must_use]
    pub fn with_serializer(store: Arc<dyn ScheduledTaskStore>, serializer: S) -> Self {
        Self {
            store,
            serializer,
            _state: PhantomData,
        }
    }
}

impl<TState, S> TaskDescriptorStore<TState, S>
where
    TState: Serialize + DeserializeOwned + Send + Sync,
    S: PayloadSerializer,
{
    /// Loads a task by id, `None` if it was never saved.
    pub async fn get_by_id(&self, id: &str) -> ConcordResult<Option<ScheduledTaskDescriptor<TState>>> {
        self.store
            .find_by_id(id)
            .await?
            .map(|record| ScheduledTaskDescriptor::from_record(record, &self.serializer))
            .transpose()
    }

    /// Inserts or fully overwrites the task.
    pub async fn save(&self, descriptor: &ScheduledTaskDescriptor<TState>) -> ConcordResult<()> {
        let record = descriptor.to_record(&self.serializer)?;
        self.store.upsert(&record).await?;

        TaskMetrics::saved(&record.task_type, record.status.as_str());
        debug!(
            task_id = %record.id,
            status = %record.status,
            next_execution = ?record.next_execution,
            "Scheduled task saved"
        );
        Ok(())
    }

    /// Tasks due at `now` that are not running, soonest first.
    pub async fn list_due(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> ConcordResult<Vec<ScheduledTaskDescriptor<TState>>> {
        self.store
            .find_due(now, limit)
            .await?
            .into_iter()
            .map(|record| ScheduledTaskDescriptor::from_record(record, &self.serializer))
            .collect()
    }

    /// Deletes a task, returning whether it existed.
    pub async fn delete(&self, id: &str) -> ConcordResult<bool> {
        let deleted = self.store.delete(id).await?;
        debug!(task_id = %id, deleted, "Scheduled task deleted");
        Ok(deleted)
    }
}

impl<TState, S: Clone> Clone for TaskDescriptorStore<TState, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            serializer: self.serializer.clone(),
            _state: PhantomData,
        }
    }
}

impl<TState, S> std::fmt::Debug for TaskDescriptorStore<TState, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDescriptorStore").finish_non_exhaustive()
    }
}
