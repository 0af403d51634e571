//! Prometheus metrics for the coordination primitives.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the host
//! installs a recorder.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Leases acquired.
    pub const LOCKS_ACQUIRED_TOTAL: &str = "concord_locks_acquired_total";
    /// Acquisitions rejected because a live lease exists.
    pub const LOCKS_CONTENDED_TOTAL: &str = "concord_locks_contended_total";
    /// Leases released.
    pub const LOCKS_RELEASED_TOTAL: &str = "concord_locks_released_total";
    /// Leases renewed.
    pub const LOCKS_RENEWED_TOTAL: &str = "concord_locks_renewed_total";
    /// Expired leases removed by cleanup.
    pub const LEASES_CLEANED_TOTAL: &str = "concord_leases_cleaned_total";
    /// Time a lease was held before release, in seconds.
    pub const LOCK_HELD_SECONDS: &str = "concord_lock_held_seconds";

    /// Messages enqueued.
    pub const MESSAGES_ENQUEUED_TOTAL: &str = "concord_messages_enqueued_total";
    /// Messages claimed by a consumer.
    pub const MESSAGES_DEQUEUED_TOTAL: &str = "concord_messages_dequeued_total";
    /// Messages rerouted to a poison queue.
    pub const MESSAGES_POISONED_TOTAL: &str = "concord_messages_poisoned_total";
    /// Messages acknowledged and deleted.
    pub const MESSAGES_ACKNOWLEDGED_TOTAL: &str = "concord_messages_acknowledged_total";
    /// Optimistic claims lost to another consumer.
    pub const CLAIM_CONFLICTS_TOTAL: &str = "concord_claim_conflicts_total";
    /// Time between enqueue and claim, in seconds.
    pub const MESSAGE_WAIT_SECONDS: &str = "concord_message_wait_seconds";

    /// Scheduled task descriptors saved.
    pub const TASKS_SAVED_TOTAL: &str = "concord_tasks_saved_total";
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(names::LOCKS_ACQUIRED_TOTAL, "Total number of leases acquired");
    describe_counter!(
        names::LOCKS_CONTENDED_TOTAL,
        "Total number of lease acquisitions rejected by a live lease"
    );
    describe_counter!(names::LOCKS_RELEASED_TOTAL, "Total number of leases released");
    describe_counter!(names::LOCKS_RENEWED_TOTAL, "Total number of leases renewed");
    describe_counter!(
        names::LEASES_CLEANED_TOTAL,
        "Total number of expired leases removed"
    );
    describe_histogram!(
        names::LOCK_HELD_SECONDS,
        "Time a lease was held before release in seconds"
    );

    describe_counter!(
        names::MESSAGES_ENQUEUED_TOTAL,
        "Total number of messages enqueued"
    );
    describe_counter!(
        names::MESSAGES_DEQUEUED_TOTAL,
        "Total number of messages claimed by consumers"
    );
    describe_counter!(
        names::MESSAGES_POISONED_TOTAL,
        "Total number of messages rerouted to a poison queue"
    );
    describe_counter!(
        names::MESSAGES_ACKNOWLEDGED_TOTAL,
        "Total number of messages acknowledged"
    );
    describe_counter!(
        names::CLAIM_CONFLICTS_TOTAL,
        "Total number of optimistic claims lost to another consumer"
    );
    describe_histogram!(
        names::MESSAGE_WAIT_SECONDS,
        "Time between enqueue and claim in seconds"
    );

    describe_counter!(
        names::TASKS_SAVED_TOTAL,
        "Total number of scheduled task descriptors saved"
    );
}

/// Lock metrics recorder.
#[derive(Clone)]
pub struct LockMetrics;

impl LockMetrics {
    /// Record a lease acquired.
    pub fn acquired(name: &str) {
        counter!(names::LOCKS_ACQUIRED_TOTAL, "lock" => name.to_string()).increment(1);
    }

    /// Record an acquisition rejected by a live lease.
    pub fn contended(name: &str) {
        counter!(names::LOCKS_CONTENDED_TOTAL, "lock" => name.to_string()).increment(1);
    }

    /// Record a lease released after being held for `held`.
    pub fn released(name: &str, held: Duration) {
        counter!(names::LOCKS_RELEASED_TOTAL, "lock" => name.to_string()).increment(1);
        histogram!(names::LOCK_HELD_SECONDS, "lock" => name.to_string())
            .record(held.as_secs_f64());
    }

    /// Record a lease renewed.
    pub fn renewed(name: &str) {
        counter!(names::LOCKS_RENEWED_TOTAL, "lock" => name.to_string()).increment(1);
    }

    /// Record expired leases removed.
    pub fn cleaned(count: u64) {
        counter!(names::LEASES_CLEANED_TOTAL).increment(count);
    }
}

/// Queue metrics recorder.
#[derive(Clone)]
pub struct QueueMetrics;

impl QueueMetrics {
    /// Record a message enqueued.
    pub fn enqueued(queue: &str) {
        counter!(names::MESSAGES_ENQUEUED_TOTAL, "queue" => queue.to_string()).increment(1);
    }

    /// Record a message claimed after waiting `wait` in the queue.
    pub fn dequeued(queue: &str, wait: Duration) {
        counter!(names::MESSAGES_DEQUEUED_TOTAL, "queue" => queue.to_string()).increment(1);
        histogram!(names::MESSAGE_WAIT_SECONDS, "queue" => queue.to_string())
            .record(wait.as_secs_f64());
    }

    /// Record a message rerouted to a poison queue.
    pub fn poisoned(queue: &str, reason: &str) {
        counter!(
            names::MESSAGES_POISONED_TOTAL,
            "queue" => queue.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    /// Record a message acknowledged.
    pub fn acknowledged(queue: &str) {
        counter!(names::MESSAGES_ACKNOWLEDGED_TOTAL, "queue" => queue.to_string()).increment(1);
    }

    /// Record an optimistic claim lost to another consumer.
    pub fn claim_conflict(queue: &str) {
        counter!(names::CLAIM_CONFLICTS_TOTAL, "queue" => queue.to_string()).increment(1);
    }
}

/// Scheduled task metrics recorder.
#[derive(Clone)]
pub struct TaskMetrics;

impl TaskMetrics {
    /// Record a descriptor saved.
    pub fn saved(task_type: &str, status: &str) {
        counter!(
            names::TASKS_SAVED_TOTAL,
            "task_type" => task_type.to_string(),
            "status" => status.to_string()
        )
        .increment(1);
    }
}
