//! Scheduled task descriptors and their store.
//!
//! The scheduler loop that polls [`TaskDescriptorStore::list_due`] belongs to
//! the worker host.

pub mod cron_expressions;
mod descriptor;
mod store;

pub use descriptor::ScheduledTaskDescriptor;
pub use store::TaskDescriptorStore;
