//! Store trait definitions.
//!
//! Each method maps to one atomic statement against the shared store. Callers
//! pass `now` explicitly so that every process judges expiry by the same rule
//! and tests can pin the clock.

use chrono::{DateTime, Utc};
use concord_core::{
    ConcordResult, Interface, Lease, MessageId, MessageState, QueueMessageRecord,
    ScheduledTaskRecord,
};
use async_trait::async_trait;

/// Durable table of named leases.
#[async_trait]
pub trait LockStore: Interface + Send + Sync {
    /// Inserts `lease`, taking over the row for its name only if that row
    /// expired before `now`.
    ///
    /// Returns `false` when a live lease already holds the name.
    async fn try_acquire(&self, lease: &Lease, now: DateTime<Utc>) -> ConcordResult<bool>;

    /// Deletes same-name leases issued no later than `lease`, plus every
    /// lease that expired before `now`.
    async fn release(&self, lease: &Lease, now: DateTime<Utc>) -> ConcordResult<u64>;

    /// Deletes every lease that expired before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> ConcordResult<u64>;

    /// Moves the expiration of a still-live `lease` to `expiration_date`.
    ///
    /// Returns `false` if the lease is gone, was taken over, or has expired.
    async fn extend(
        &self,
        lease: &Lease,
        expiration_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ConcordResult<bool>;

    /// Finds the current lease row for `name`, live or not.
    async fn find_by_name(&self, name: &str) -> ConcordResult<Option<Lease>>;
}

/// Durable table of queued payloads.
#[async_trait]
pub trait QueueStore: Interface + Send + Sync {
    /// Inserts a new message row.
    async fn insert(&self, record: &QueueMessageRecord) -> ConcordResult<()>;

    /// Re-enqueues message `id` under `queue_name` with a new payload and
    /// state at the tail of the queue, incrementing its dequeue count and
    /// concurrency token. Inserts the row if it is absent.
    async fn upsert(
        &self,
        id: MessageId,
        queue_name: &str,
        payload: &str,
        state: MessageState,
        now: DateTime<Utc>,
    ) -> ConcordResult<()>;

    /// Finds the oldest row of `queue_name` in `state`, ordered by enqueue
    /// time then enqueue sequence.
    async fn find_oldest(
        &self,
        queue_name: &str,
        state: MessageState,
    ) -> ConcordResult<Option<QueueMessageRecord>>;

    /// Claims a row if it still carries `expected_token` and `expected_state`.
    ///
    /// Returns `false` when another writer got there first.
    async fn try_claim(
        &self,
        id: MessageId,
        expected_token: i64,
        expected_state: MessageState,
        now: DateTime<Utc>,
    ) -> ConcordResult<bool>;

    /// Counts rows of `queue_name` in `state`.
    async fn count(&self, queue_name: &str, state: MessageState) -> ConcordResult<u64>;

    /// Finds a message by id in any queue.
    async fn find_by_id(&self, id: MessageId) -> ConcordResult<Option<QueueMessageRecord>>;

    /// Moves a row to another queue and state, leaving its payload untouched.
    async fn relocate(
        &self,
        id: MessageId,
        queue_name: &str,
        state: MessageState,
    ) -> ConcordResult<bool>;

    /// Deletes a message by id.
    async fn delete(&self, id: MessageId) -> ConcordResult<bool>;

    /// Deletes claimed rows of `queue_name` last claimed before `older_than`.
    async fn purge_dequeued(
        &self,
        queue_name: &str,
        older_than: DateTime<Utc>,
    ) -> ConcordResult<u64>;
}

/// Durable table of scheduled task descriptors.
#[async_trait]
pub trait ScheduledTaskStore: Interface + Send + Sync {
    /// Finds a task by id.
    async fn find_by_id(&self, id: &str) -> ConcordResult<Option<ScheduledTaskRecord>>;

    /// Inserts or fully overwrites a task by id.
    async fn upsert(&self, record: &ScheduledTaskRecord) -> ConcordResult<()>;

    /// Finds tasks with `next_execution <= now` that are not running,
    /// soonest first.
    async fn find_due(&self, now: DateTime<Utc>, limit: u32) -> ConcordResult<Vec<ScheduledTaskRecord>>;

    /// Deletes a task by id.
    async fn delete(&self, id: &str) -> ConcordResult<bool>;
}
