//! Lifecycle states of coordination records.

mod message_state;
mod task_status;

pub use message_state::*;
pub use task_status::*;
