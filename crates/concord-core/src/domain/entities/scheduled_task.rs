//! Scheduled task record.

use crate::TaskStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled task row as stored: error trail and state are opaque text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTaskRecord {
    /// Stable identity of the job.
    pub id: String,
    /// Worker that last saved the task.
    pub worker_id: Option<String>,
    /// Grouping label.
    pub group: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Logical handler of the state payload.
    pub task_type: String,
    /// Start of the last execution.
    pub last_execution: Option<DateTime<Utc>>,
    /// Next planned execution; `None` means not scheduled again.
    pub next_execution: Option<DateTime<Utc>>,
    /// Number of executions so far.
    pub execution_count: u32,
    /// Current status.
    pub status: TaskStatus,
    /// Serialized failure trail.
    pub errors: Option<String>,
    /// Serialized task state.
    pub payload: Option<String>,
    /// Completion fraction between 0.0 and 1.0.
    pub progress: f64,
}

impl ScheduledTaskRecord {
    /// Creates an idle record with no history.
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
            errors: None,
            payload: None,
            progress: 0.0,
        }
    }

    /// Checks if the task should run at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_runnable() && self.next_execution.is_some_and(|next| next <= now)
    }
}
