//! Lease entity.

use crate::LeaseId;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A time-bounded exclusivity token over a named resource.
///
/// A lease is live while `expiration_date` has not passed. Nothing extends it
/// implicitly; holders that need longer must renew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Lease token, unique and time-ordered.
    pub id: LeaseId,
    /// Name of the protected resource.
    pub name: String,
    /// Instant after which the lease is considered abandoned.
    pub expiration_date: DateTime<Utc>,
}

impl Lease {
    /// Creates a new lease for `name` valid for `ttl` from `now`.
    #[must_use]
    pub fn new(name: impl Into<String>, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            id: LeaseId::new(),
            name: name.into(),
            expiration_date: expiration_after(now, ttl),
        }
    }

    /// Checks if the lease has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expiration_date - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Adds a std duration to a timestamp, saturating on overflow.
#[must_use]
pub fn expiration_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    ChronoDuration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
