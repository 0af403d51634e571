//! Lease-based distributed locking.

mod manager;

pub use manager::{DistributedLock, DistributedLockExt, LockManager, LockManagerParameters};
