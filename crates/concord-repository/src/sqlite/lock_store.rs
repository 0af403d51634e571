//! SQLite lock store.

use super::{from_nanos, to_nanos};
use crate::{traits::LockStore, DatabasePoolInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use concord_core::{ConcordError, ConcordResult, Lease, LeaseId};
use shaku::Component;
use sqlx::FromRow;
use std::sync::Arc;
use tracing::debug;

/// Lock store over the `locks` table.
#[derive(Component, Clone)]
#[shaku(interface = LockStore)]
pub struct SqliteLockStore {
    #[shaku(inject)]
    pool: Arc<dyn DatabasePoolInterface>,
}

impl SqliteLockStore {
    /// Creates a new SQLite lock store.
    #[must_use]
    pub fn new(pool: Arc<dyn DatabasePoolInterface>) -> Self {
        Self { pool }
    }
}

/// Database row representation of a lease.
#[derive(Debug, FromRow)]
struct LeaseRow {
    id: String,
    name: String,
    expiration_date: i64,
}

impl TryFrom<LeaseRow> for Lease {
    type Error = ConcordError;

    fn try_from(row: LeaseRow) -> Result<Self, Self::Error> {
        let id = LeaseId::parse(&row.id)
            .map_err(|e| ConcordError::Internal(format!("Invalid lease id in database: {}", e)))?;

        Ok(Lease {
            id,
            name: row.name,
            expiration_date: from_nanos(row.expiration_date),
        })
    }
}

#[async_trait]
impl LockStore for SqliteLockStore {
    async fn try_acquire(&self, lease: &Lease, now: DateTime<Utc>) -> ConcordResult<bool> {
        debug!(name = %lease.name, lease_id = %lease.id, "Inserting lease");

        let result = sqlx::query(
            r#"
            INSERT INTO locks (id, name, expiration_date)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE
                SET id = excluded.id,
                    expiration_date = excluded.expiration_date
                WHERE locks.expiration_date < ?
            "#,
        )
        .bind(lease.id.to_string())
        .bind(&lease.name)
        .bind(to_nanos(lease.expiration_date))
        .bind(to_nanos(now))
        .execute(self.pool.inner())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, lease: &Lease, now: DateTime<Utc>) -> ConcordResult<u64> {
        debug!(name = %lease.name, lease_id = %lease.id, "Deleting lease");

        let result = sqlx::query(
            "DELETE FROM locks WHERE (name = ? AND id <= ?) OR expiration_date < ?",
        )
        .bind(&lease.name)
        .bind(lease.id.to_string())
        .bind(to_nanos(now))
        .execute(self.pool.inner())
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> ConcordResult<u64> {
        let result = sqlx::query("DELETE FROM locks WHERE expiration_date < ?")
            .bind(to_nanos(now))
            .execute(self.pool.inner())
            .await?;

        debug!(deleted = result.rows_affected(), "Deleted expired leases");
        Ok(result.rows_affected())
    }

    async fn extend(
        &self,
        lease: &Lease,
        expiration_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ConcordResult<bool> {
        debug!(name = %lease.name, lease_id = %lease.id, "Extending lease");

        let result = sqlx::query(
            r#"
            UPDATE locks
            SET expiration_date = ?
            WHERE id = ? AND name = ? AND expiration_date >= ?
            "#,
        )
        .bind(to_nanos(expiration_date))
        .bind(lease.id.to_string())
        .bind(&lease.name)
        .bind(to_nanos(now))
        .execute(self.pool.inner())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_name(&self, name: &str) -> ConcordResult<Option<Lease>> {
        let row = sqlx::query_as::<_, LeaseRow>(
            "SELECT id, name, expiration_date FROM locks WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(self.pool.inner())
        .await?;

        row.map(Lease::try_from).transpose()
    }
}
