//! # Concord Jobs
//!
//! Coordination primitives for background workers that share one SQLite
//! database and nothing else:
//!
//! - [`LockManager`]: lease-based named locks with expiry, renewal, and
//!   cleanup of abandoned leases.
//! - [`MessageQueue`]: typed, multi-consumer queue with at-least-once
//!   delivery, optimistic claims, and poison-queue rerouting.
//! - [`TaskDescriptorStore`]: typed descriptors of recurring and one-shot
//!   tasks for an external scheduler loop.
//!
//! # Example
//!
//! ```rust,ignore
//! use concord_jobs::prelude::*;
//!
//! let module = build_coordination_module(&config.database, &config.locks).await?;
//! let locks = concord_jobs::di::lock_manager(&module);
//!
//! locks
//!     .with_lock("nightly-report", None, |_lease| async {
//!         // singleton work
//!         Ok::<_, ConcordError>(())
//!     })
//!     .await?;
//!
//! let emails: MessageQueue<SendEmail> =
//!     concord_jobs::di::message_queue(&module, "emails", &config.queue);
//! if let Some(message) = emails.dequeue().await? {
//!     match send(&message.item).await {
//!         Ok(()) => {
//!             emails.acknowledge(message.id).await?;
//!         }
//!         Err(_) => {
//!             emails.retry_or_poison(&message, config.queue.max_dequeue_count).await?;
//!         }
//!     }
//! }
//! ```

pub mod di;
pub mod lock;
pub mod metrics;
pub mod queue;
pub mod retry;
pub mod serializer;
pub mod tasks;

pub use di::{build_coordination_module, CoordinationModule};
pub use lock::{DistributedLock, DistributedLockExt, LockManager};
pub use metrics::{register_metrics, LockMetrics, QueueMetrics, TaskMetrics};
pub use queue::{MessageQueue, PoisonSuffixResolver, QueueMessage, QueueNameResolver, RetryOutcome};
pub use retry::{RetryPolicy, RetryStrategy};
pub use serializer::{JsonSerializer, PayloadSerializer};
pub use tasks::{cron_expressions, ScheduledTaskDescriptor, TaskDescriptorStore};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::di::build_coordination_module;
    pub use crate::lock::{DistributedLock, DistributedLockExt};
    pub use crate::queue::{MessageQueue, QueueMessage, RetryOutcome};
    pub use crate::retry::RetryPolicy;
    pub use crate::tasks::{ScheduledTaskDescriptor, TaskDescriptorStore};
    pub use concord_core::{ConcordError, ConcordResult, Lease, MessageId};
}
