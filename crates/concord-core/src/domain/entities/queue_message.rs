//! Queue message record.

use crate::{MessageId, MessageState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A queue row as stored: the payload is opaque text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessageRecord {
    /// Message identity.
    pub id: MessageId,
    /// Logical queue the message currently belongs to.
    pub queue_name: String,
    /// Serialized payload.
    pub payload: String,
    /// When the message was first enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// When the message was last claimed.
    pub dequeued_at: Option<DateTime<Utc>>,
    /// Delivery counter, advanced by every claim and every re-enqueue.
    pub dequeue_count: u32,
    /// Delivery state.
    pub state: MessageState,
    /// Optimistic version, bumped on every write.
    pub concurrency_token: i64,
}

impl QueueMessageRecord {
    /// Creates a fresh record that has never been claimed.
    #[must_use]
    pub fn new(
        queue_name: impl Into<String>,
        payload: impl Into<String>,
        state: MessageState,
        now: DateTime<Utc>,
    ) -> Self {
        Self::with_id(MessageId::new(), queue_name, payload, state, now)
    }

    /// Creates a fresh record with a caller-chosen id.
    #[must_use]
    pub fn with_id(
        id: MessageId,
        queue_name: impl Into<String>,
        payload: impl Into<String>,
        state: MessageState,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            queue_name: queue_name.into(),
            payload: payload.into(),
            enqueued_at: now,
            dequeued_at: None,
            dequeue_count: 0,
            state,
            concurrency_token: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unclaimed() {
        let record = QueueMessageRecord::new("emails", "{}", MessageState::New, Utc::now());
        assert_eq!(record.dequeue_count, 0);
        assert_eq!(record.concurrency_token, 0);
        assert!(record.dequeued_at.is_none());
        assert_eq!(record.state, MessageState::New);
    }
}
