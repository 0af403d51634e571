//! Persisted coordination records.

mod lease;
mod queue_message;
mod scheduled_task;

pub use lease::*;
pub use queue_message::*;
pub use scheduled_task::*;
