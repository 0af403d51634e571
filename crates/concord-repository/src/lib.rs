//! # Concord Repository
//!
//! SQLite storage for the coordination primitives:
//!
//! ```text
//! LockManager / MessageQueue / TaskDescriptorStore   (concord-jobs)
//!   ↓  Arc<dyn LockStore | QueueStore | ScheduledTaskStore>
//! SqliteLockStore / SqliteQueueStore / SqliteScheduledTaskStore
//!   ↓  Arc<dyn DatabasePoolInterface>
//! SQLite (WAL)
//! ```

pub mod pool;
pub mod sqlite;
pub mod traits;

pub use pool::*;
pub use sqlite::*;
pub use traits::*;
