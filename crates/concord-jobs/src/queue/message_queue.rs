//! Typed message queue over a [`QueueStore`].
//!
//! Delivery is at-least-once: a claimed message stays in the store as
//! `Dequeued` until the consumer acknowledges it, and a consumer that fails
//! re-enqueues it (possibly to the poison queue). Claims are optimistic: the
//! oldest claimable row is read, then updated only if its concurrency token is
//! unchanged, so two consumers never receive the same claim.

use super::names::{PoisonSuffixResolver, QueueNameResolver};
use crate::metrics::QueueMetrics;
use crate::serializer::{for_row, JsonSerializer, PayloadSerializer};
use chrono::{DateTime, Utc};
use concord_config::QueueConfig;
use concord_core::{ConcordResult, MessageId, MessageState, QueueMessageRecord};
use concord_repository::QueueStore;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A claimed message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage<T> {
    /// Message identity, stable across re-enqueues.
    pub id: MessageId,
    /// Queue the message was claimed from.
    pub queue_name: String,
    /// Deserialized payload.
    pub item: T,
    /// When the message was (re-)enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// When this claim happened.
    pub dequeued_at: DateTime<Utc>,
    /// Delivery counter including this claim; re-enqueues advance it too.
    pub dequeue_count: u32,
}

/// Where [`MessageQueue::retry_or_poison`] sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Back on the active queue.
    Retried,
    /// Moved to the poison queue.
    Poisoned,
}

/// Typed queue of `T` stored as text through `S`.
///
/// A queue is either the active queue for its base name or, when obtained
/// through [`poison_queue`](Self::poison_queue), the matching dead-letter
/// queue. Active queues claim `New` messages; poison queues claim `Poison`
/// messages.
pub struct MessageQueue<T, S = JsonSerializer> {
    store: Arc<dyn QueueStore>,
    resolver: Arc<dyn QueueNameResolver>,
    serializer: S,
    name: String,
    is_poison: bool,
    max_claim_attempts: u32,
    _item: PhantomData<fn() -> T>,
}

impl<T> MessageQueue<T, JsonSerializer>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Creates the active queue `name` with JSON payloads.
    #[must_use]
    pub fn new(store: Arc<dyn QueueStore>, name: impl Into<String>, config: &QueueConfig) -> Self {
        Self {
            store,
            resolver: Arc::new(PoisonSuffixResolver::new(config.poison_suffix.clone())),
            serializer: JsonSerializer,
            name: name.into(),
            is_poison: false,
            max_claim_attempts: config.max_claim_attempts.max(1),
            _item: PhantomData,
        }
    }
}

impl<T, S> MessageQueue<T, S>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    S: PayloadSerializer + Clone,
{
    /// Replaces the payload serializer.
    #[must_use]
    pub fn with_serializer<S2: PayloadSerializer + Clone>(self, serializer: S2) -> MessageQueue<T, S2> {
        MessageQueue {
            store: self.store,
            resolver: self.resolver,
            serializer,
            name: self.name,
            is_poison: self.is_poison,
            max_claim_attempts: self.max_claim_attempts,
            _item: PhantomData,
        }
    }

    /// Replaces the queue name resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn QueueNameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Bounds the optimistic claim loop of a single [`dequeue`](Self::dequeue).
    #[must_use]
    pub fn with_max_claim_attempts(mut self, attempts: u32) -> Self {
        self.max_claim_attempts = attempts.max(1);
        self
    }

    /// Base queue name shared by the active and poison queues.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical name of this queue.
    #[must_use]
    pub fn queue_name(&self) -> String {
        self.resolver.resolve(&self.name, self.is_poison)
    }

    /// Checks if this is a dead-letter queue view.
    #[must_use]
    pub const fn is_poison_queue(&self) -> bool {
        self.is_poison
    }

    /// Typed view over the dead-letter queue of the same base name.
    #[must_use]
    pub fn poison_queue(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            resolver: Arc::clone(&self.resolver),
            serializer: self.serializer.clone(),
            name: self.name.clone(),
            is_poison: true,
            max_claim_attempts: self.max_claim_attempts,
            _item: PhantomData,
        }
    }

    fn claimable_state(&self) -> MessageState {
        MessageState::claimable_for(self.is_poison)
    }

    /// Number of messages waiting to be claimed.
    pub async fn count(&self) -> ConcordResult<u64> {
        self.store
            .count(&self.queue_name(), self.claimable_state())
            .await
    }

    /// Enqueues `item`.
    ///
    /// Without `message_id` a new message is inserted. With an id, the
    /// existing message is re-enqueued: it moves to the active queue, or to
    /// the poison queue when `is_poison` is set, with `item` as its payload,
    /// goes to the tail, and has its dequeue count incremented.
    pub async fn enqueue(
        &self,
        item: &T,
        message_id: Option<MessageId>,
        is_poison: bool,
    ) -> ConcordResult<MessageId> {
        let target = self.resolver.resolve(&self.name, is_poison);
        let state = MessageState::claimable_for(is_poison);
        let payload = self.serializer.serialize(item).map_err(|e| match message_id {
            Some(id) => for_row(e, id),
            None => e,
        })?;
        let now = Utc::now();

        let id = match message_id {
            Some(id) => {
                self.store.upsert(id, &target, &payload, state, now).await?;
                id
            }
            None => {
                let record = QueueMessageRecord::new(target.as_str(), payload, state, now);
                self.store.insert(&record).await?;
                record.id
            }
        };

        if is_poison {
            QueueMetrics::poisoned(&self.name, "rerouted");
        } else {
            QueueMetrics::enqueued(&target);
        }
        debug!(queue = %target, message_id = %id, state = %state, "Message enqueued");
        Ok(id)
    }

    /// Claims the oldest waiting message, if any.
    ///
    /// A payload that cannot be deserialized is reported as a serialization
    /// error carrying the message id, and the row is left untouched; move it
    /// aside with [`quarantine`](Self::quarantine).
    pub async fn dequeue(&self) -> ConcordResult<Option<QueueMessage<T>>> {
        let queue_name = self.queue_name();
        let state = self.claimable_state();

        for attempt in 1..=self.max_claim_attempts {
            let Some(record) = self.store.find_oldest(&queue_name, state).await? else {
                return Ok(None);
            };

            let item: T = self
                .serializer
                .deserialize(&record.payload)
                .map_err(|e| for_row(e, record.id))?;

            let now = Utc::now();
            if self
                .store
                .try_claim(record.id, record.concurrency_token, state, now)
                .await?
            {
                let wait = (now - record.enqueued_at).to_std().unwrap_or_default();
                QueueMetrics::dequeued(&queue_name, wait);
                debug!(queue = %queue_name, message_id = %record.id, attempt, "Message claimed");

                return Ok(Some(QueueMessage {
                    id: record.id,
                    queue_name: record.queue_name,
                    item,
                    enqueued_at: record.enqueued_at,
                    dequeued_at: now,
                    dequeue_count: record.dequeue_count.saturating_add(1),
                }));
            }

            QueueMetrics::claim_conflict(&queue_name);
            debug!(queue = %queue_name, message_id = %record.id, attempt, "Claim lost to another consumer");
        }

        warn!(
            queue = %queue_name,
            attempts = self.max_claim_attempts,
            "Gave up claiming after repeated conflicts"
        );
        Ok(None)
    }

    /// Returns the payload of the oldest waiting message without claiming it.
    pub async fn peek(&self) -> ConcordResult<Option<T>> {
        let record = self
            .store
            .find_oldest(&self.queue_name(), self.claimable_state())
            .await?;

        record
            .map(|record| {
                self.serializer
                    .deserialize(&record.payload)
                    .map_err(|e| for_row(e, record.id))
            })
            .transpose()
    }

    /// Deletes a processed message.
    pub async fn acknowledge(&self, id: MessageId) -> ConcordResult<bool> {
        let deleted = self.store.delete(id).await?;
        if deleted {
            QueueMetrics::acknowledged(&self.queue_name());
        }
        debug!(queue = %self.queue_name(), message_id = %id, deleted, "Message acknowledged");
        Ok(deleted)
    }

    /// Re-enqueues a failed message, poisoning it once its dequeue count has
    /// reached `max_dequeue_count`.
    ///
    /// The count grows by one per claim and one per re-enqueue: a message on
    /// its first delivery carries 1, on its second 3, on its n-th `2n - 1`.
    pub async fn retry_or_poison(
        &self,
        message: &QueueMessage<T>,
        max_dequeue_count: u32,
    ) -> ConcordResult<RetryOutcome> {
        let poison = message.dequeue_count >= max_dequeue_count;
        self.enqueue(&message.item, Some(message.id), poison).await?;

        if poison {
            warn!(
                queue = %self.name,
                message_id = %message.id,
                dequeue_count = message.dequeue_count,
                "Message poisoned"
            );
            Ok(RetryOutcome::Poisoned)
        } else {
            Ok(RetryOutcome::Retried)
        }
    }

    /// Moves a message to the poison queue without reading its payload.
    pub async fn quarantine(&self, id: MessageId) -> ConcordResult<bool> {
        let target = self.resolver.resolve(&self.name, true);
        let moved = self.store.relocate(id, &target, MessageState::Poison).await?;
        if moved {
            QueueMetrics::poisoned(&self.name, "quarantined");
            warn!(queue = %target, message_id = %id, "Message quarantined");
        }
        Ok(moved)
    }

    /// Deletes claimed messages of this queue last claimed more than
    /// `older_than` ago.
    pub async fn purge_dequeued(&self, older_than: Duration) -> ConcordResult<u64> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        self.store.purge_dequeued(&self.queue_name(), cutoff).await
    }
}

impl<T, S: Clone> Clone for MessageQueue<T, S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            resolver: Arc::clone(&self.resolver),
            serializer: self.serializer.clone(),
            name: self.name.clone(),
            is_poison: self.is_poison,
            max_claim_attempts: self.max_claim_attempts,
            _item: PhantomData,
        }
    }
}

impl<T, S> std::fmt::Debug for MessageQueue<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("name", &self.name)
            .field("is_poison", &self.is_poison)
            .field("max_claim_attempts", &self.max_claim_attempts)
            .finish_non_exhaustive()
    }
}
