//! Typed scheduled task descriptor.

use crate::serializer::{for_row, PayloadSerializer};
use chrono::{DateTime, Utc};
use concord_core::{ConcordResult, ScheduledTaskRecord, TaskStatus};
use cron::Schedule;
use serde::{de::DeserializeOwned, Serialize};

/// A recurring or one-shot task with typed state.
///
/// `next_execution == None` means the task is not scheduled again.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledTaskDescriptor<TState> {
    /// Stable identity of the job.
    pub id: String,
    /// Worker that last ran the task.
    pub worker_id: Option<String>,
    /// Grouping label.
    pub group: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Logical handler of the state.
    pub task_type: String,
    /// Start of the last execution.
    pub last_execution: Option<DateTime<Utc>>,
    /// Next planned execution.
    pub next_execution: Option<DateTime<Utc>>,
    /// Number of executions so far.
    pub execution_count: u32,
    /// Current status.
    pub status: TaskStatus,
    /// Failure trail, oldest first.
    pub errors: Vec<String>,
    /// Task-specific state carried between executions.
    pub state: Option<TState>,
    progress: f64,
}

impl<TState> ScheduledTaskDescriptor<TState> {
    /// Creates an idle, unscheduled task.
    #[must_use]
    pub fn new(id: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            worker_id: None,
            group: None,
            description: None,
            task_type: task_type.into(),
            last_execution: None,
            next_execution: None,
            execution_count: 0,
            status: TaskStatus::Idle,
            errors: Vec::new(),
            state: None,
            progress: 0.0,
        }
    }

    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: TState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub fn with_next_execution(mut self, next: DateTime<Utc>) -> Self {
        self.next_execution = Some(next);
        self
    }

    /// Completion fraction between 0.0 and 1.0.
    #[must_use]
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    /// Sets the completion fraction, clamped to 0.0..=1.0. NaN counts as 0.
    pub fn set_progress(&mut self, fraction: f64) {
        self.progress = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
    }

    /// Records the start of an execution by `worker_id`.
    pub fn mark_running(&mut self, worker_id: impl Into<String>, now: DateTime<Utc>) {
        self.worker_id = Some(worker_id.into());
        self.status = TaskStatus::Running;
        self.last_execution = Some(now);
        self.execution_count = self.execution_count.saturating_add(1);
        self.progress = 0.0;
    }

    /// Records a successful execution.
    pub fn mark_completed(&mut self, next_execution: Option<DateTime<Utc>>) {
        self.status = TaskStatus::Completed;
        self.next_execution = next_execution;
        self.progress = 1.0;
    }

    /// Records a failed execution and appends `error` to the trail.
    pub fn mark_faulted(&mut self, error: impl Into<String>, next_execution: Option<DateTime<Utc>>) {
        self.status = TaskStatus::Faulted;
        self.errors.push(error.into());
        self.next_execution = next_execution;
    }

    /// Sets the next execution to the first `schedule` slot after `after`.
    pub fn schedule_next(&mut self, schedule: &Schedule, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_execution = schedule.after(&after).next();
        self.next_execution
    }

    /// Checks if the task should run at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_runnable() && self.next_execution.is_some_and(|next| next <= now)
    }
}

impl<TState> ScheduledTaskDescriptor<TState>
where
    TState: Serialize + DeserializeOwned,
{
    /// Converts to a stored record, serializing state and error trail.
    pub fn to_record<S: PayloadSerializer>(&self, serializer: &S) -> ConcordResult<ScheduledTaskRecord> {
        let errors = if self.errors.is_empty() {
            None
        } else {
            Some(serializer.serialize(&self.errors).map_err(|e| for_row(e, &self.id))?)
        };
        let payload = self
            .state
            .as_ref()
            .map(|state| serializer.serialize(state))
            .transpose()
            .map_err(|e| for_row(e, &self.id))?;

        Ok(ScheduledTaskRecord {
            id: self.id.clone(),
            worker_id: self.worker_id.clone(),
            group: self.group.clone(),
            description: self.description.clone(),
            task_type: self.task_type.clone(),
            last_execution: self.last_execution,
            next_execution: self.next_execution,
            execution_count: self.execution_count,
            status: self.status,
            errors,
            payload,
            progress: self.progress,
        })
    }

    /// Rebuilds a descriptor from a stored record.
    pub fn from_record<S: PayloadSerializer>(record: ScheduledTaskRecord, serializer: &S) -> ConcordResult<Self> {
        let errors = match record.errors.as_deref() {
            None | Some("") => Vec::new(),
            Some(text) => serializer.deserialize(text).map_err(|e| for_row(e, &record.id))?,
        };
        let state = record
            .payload
            .as_deref()
            .map(|text| serializer.deserialize(text))
            .transpose()
            .map_err(|e| for_row(e, &record.id))?;

        let mut descriptor = Self {
            id: record.id,
            worker_id: record.worker_id,
            group: record.group,
            description: record.description,
            task_type: record.task_type,
            last_execution: record.last_execution,
            next_execution: record.next_execution,
            execution_count: record.execution_count,
            status: record.status,
            errors,
            state,
            progress: 0.0,
        };
        descriptor.set_progress(record.progress);
        Ok(descriptor)
    }
}
