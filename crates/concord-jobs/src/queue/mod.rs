//! Durable multi-consumer message queue.

mod message_queue;
mod names;

pub use message_queue::{MessageQueue, QueueMessage, RetryOutcome};
pub use names::{PoisonSuffixResolver, QueueNameResolver};
