//! SQLx implementations of the store traits for SQLite.

mod lock_store;
mod queue_store;
mod task_store;

pub use lock_store::SqliteLockStore;
pub use queue_store::SqliteQueueStore;
pub use task_store::SqliteScheduledTaskStore;

use chrono::{DateTime, Utc};
use concord_core::{ConcordError, ConcordResult};

/// Converts a timestamp to stored epoch nanoseconds.
///
/// Instants outside the `i64` nanosecond range (before 1677 or after 2262)
/// saturate to the nearest bound.
pub(crate) fn to_nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt()
        .unwrap_or(if at.timestamp() < 0 { i64::MIN } else { i64::MAX })
}

/// Converts stored epoch nanoseconds back to a timestamp.
pub(crate) fn from_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

pub(crate) fn to_count(value: i64, column: &str) -> ConcordResult<u32> {
    u32::try_from(value)
        .map_err(|_| ConcordError::Internal(format!("Invalid {} in database: {}", column, value)))
}

pub(crate) fn to_total(value: i64) -> ConcordResult<u64> {
    u64::try_from(value)
        .map_err(|_| ConcordError::Internal(format!("Invalid row count from database: {}", value)))
}
