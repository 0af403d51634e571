//! Scheduled task status value object.

use crate::ConcordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Execution status of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for its next execution.
    #[default]
    Idle,
    /// Claimed by a worker and executing.
    Running,
    /// The last execution failed.
    Faulted,
    /// Finished and not scheduled again.
    Completed,
}

impl TaskStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Faulted => "faulted",
            Self::Completed => "completed",
        }
    }

    /// Checks if a scheduler may pick the task up.
    ///
    /// Only a running task is excluded; a completed task with a next
    /// execution is a recurring one waiting for its next slot.
    #[must_use]
    pub const fn is_runnable(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "faulted" => Ok(Self::Faulted),
            "completed" => Ok(Self::Completed),
            other => Err(ConcordError::Internal(format!("Unknown task status: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_runnable() {
        assert!(TaskStatus::Idle.is_runnable());
        assert!(TaskStatus::Faulted.is_runnable());
        assert!(!TaskStatus::Running.is_runnable());
        assert!(TaskStatus::Completed.is_runnable());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("running".parse::<TaskStatus>().unwrap(), TaskStatus::Running);
        assert!("paused".parse::<TaskStatus>().is_err());
    }
}
