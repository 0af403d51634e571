//! Lock manager over a [`LockStore`].
//!
//! Acquisition fails fast: when a live lease holds the name, the manager
//! sweeps expired leases and reports [`ConcordError::LockContention`]. Leases
//! are never extended implicitly.

use crate::metrics::LockMetrics;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use chrono::Utc;
use concord_config::LockConfig;
use concord_core::{expiration_after, ConcordError, ConcordResult, Interface, Lease};
use concord_repository::LockStore;
use shaku::Component;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Mutual exclusion over named resources shared by worker processes.
#[async_trait]
pub trait DistributedLock: Interface + Send + Sync {
    /// Acquires a lease on `name` for `timeout`, or the default lease lifetime.
    async fn acquire_lock(&self, name: &str, timeout: Option<Duration>) -> ConcordResult<Lease>;

    /// Releases `lease` and sweeps expired leases of any name.
    async fn release_lock(&self, lease: &Lease) -> ConcordResult<()>;

    /// Deletes every expired lease, returning how many were removed.
    async fn cleanup(&self) -> ConcordResult<u64>;

    /// Extends a still-held, still-live lease to `timeout` from now.
    async fn renew_lock(&self, lease: &Lease, timeout: Option<Duration>) -> ConcordResult<Lease>;

    /// Reads the current lease row for `name`, live or expired.
    async fn find_lease(&self, name: &str) -> ConcordResult<Option<Lease>>;
}

/// Lock helpers available on every [`DistributedLock`].
#[async_trait]
pub trait DistributedLockExt: DistributedLock {
    /// Acquires a lease, retrying contention and store outages per `policy`.
    async fn acquire_lock_with_retry(
        &self,
        name: &str,
        timeout: Option<Duration>,
        policy: &RetryPolicy,
    ) -> ConcordResult<Lease> {
        let mut retry = 0;
        loop {
            match self.acquire_lock(name, timeout).await {
                Ok(lease) => return Ok(lease),
                Err(err) => {
                    retry += 1;
                    if !policy.should_retry_error(retry, &err) {
                        return Err(err);
                    }
                    let delay = policy.delay_for_attempt(retry);
                    debug!(name = %name, retry, delay_ms = delay.as_millis(), error = %err, "Retrying lease acquisition");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Runs `f` while holding a lease on `name`.
    ///
    /// The lease is released whether `f` succeeds or fails. A failure of `f`
    /// takes precedence over a failed release. If the returned future is
    /// dropped before completion the lease is left to expire.
    async fn with_lock<F, Fut, R, E>(
        &self,
        name: &str,
        timeout: Option<Duration>,
        f: F,
    ) -> Result<R, E>
    where
        F: FnOnce(Lease) -> Fut + Send,
        Fut: Future<Output = Result<R, E>> + Send,
        R: Send,
        E: From<ConcordError> + Send,
    {
        let lease = self.acquire_lock(name, timeout).await?;
        let outcome = f(lease.clone()).await;
        let released = self.release_lock(&lease).await;

        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err.into()),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(release_err)) => {
                warn!(name = %name, error = %release_err, "Failed to release lease after task error");
                Err(err)
            }
        }
    }
}

impl<T: DistributedLock + ?Sized> DistributedLockExt for T {}

/// Lock manager backed by a shared lock store.
#[derive(Component)]
#[shaku(interface = DistributedLock)]
pub struct LockManager {
    #[shaku(inject)]
    store: Arc<dyn LockStore>,
    default_timeout: Duration,
}

impl LockManager {
    /// Creates a new lock manager.
    #[must_use]
    pub fn new(store: Arc<dyn LockStore>, default_timeout: Duration) -> Self {
        Self {
            store,
            default_timeout,
        }
    }

    /// Creates a lock manager using the configured default lease lifetime.
    #[must_use]
    pub fn from_config(store: Arc<dyn LockStore>, config: &LockConfig) -> Self {
        Self::new(store, config.default_timeout())
    }

    /// Lease lifetime used when the caller passes no timeout.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    fn validate_name(name: &str) -> ConcordResult<()> {
        if name.trim().is_empty() {
            return Err(ConcordError::validation("Lock name cannot be empty"));
        }
        Ok(())
    }
}

#[async_trait]
impl DistributedLock for LockManager {
    async fn acquire_lock(&self, name: &str, timeout: Option<Duration>) -> ConcordResult<Lease> {
        Self::validate_name(name)?;

        let now = Utc::now();
        let lease = Lease::new(name, timeout.unwrap_or(self.default_timeout), now);

        if self.store.try_acquire(&lease, now).await? {
            LockMetrics::acquired(name);
            debug!(name = %name, lease_id = %lease.id, expires = %lease.expiration_date, "Lease acquired");
            return Ok(lease);
        }

        LockMetrics::contended(name);
        debug!(name = %name, "Lease held by another worker");
        self.cleanup().await?;
        Err(ConcordError::lock_contention(name))
    }

    async fn release_lock(&self, lease: &Lease) -> ConcordResult<()> {
        let now = Utc::now();
        let deleted = self.store.release(lease, now).await?;

        let held = lease
            .id
            .issued_at()
            .and_then(|issued| (now - issued).to_std().ok())
            .unwrap_or_default();
        LockMetrics::released(&lease.name, held);
        debug!(name = %lease.name, lease_id = %lease.id, deleted, "Lease released");
        Ok(())
    }

    async fn cleanup(&self) -> ConcordResult<u64> {
        let deleted = self.store.delete_expired(Utc::now()).await?;
        if deleted > 0 {
            LockMetrics::cleaned(deleted);
            info!(deleted, "Removed expired leases");
        }
        Ok(deleted)
    }

    async fn renew_lock(&self, lease: &Lease, timeout: Option<Duration>) -> ConcordResult<Lease> {
        let now = Utc::now();
        let expiration_date = expiration_after(now, timeout.unwrap_or(self.default_timeout));

        if self.store.extend(lease, expiration_date, now).await? {
            LockMetrics::renewed(&lease.name);
            debug!(name = %lease.name, lease_id = %lease.id, expires = %expiration_date, "Lease renewed");
            return Ok(Lease {
                id: lease.id,
                name: lease.name.clone(),
                expiration_date,
            });
        }

        warn!(name = %lease.name, lease_id = %lease.id, "Lease lost before renewal");
        Err(ConcordError::lock_contention(&lease.name))
    }

    async fn find_lease(&self, name: &str) -> ConcordResult<Option<Lease>> {
        self.store.find_by_name(name).await
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}
