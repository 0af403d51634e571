//! Typed ID wrappers for coordination records.
//!
//! Both ids are UUIDv7, so their natural ordering (and the ordering of their
//! hyphenated text form in the store) follows creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use uuid::Uuid;

/// Opaque lease token handed out by the lock manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(pub Uuid);

impl LeaseId {
    /// Creates a new time-ordered lease ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a lease ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }

    /// Instant the lease was issued, read from the UUIDv7 timestamp.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        let (secs, nanos) = self.0.get_timestamp()?.to_unix();
        DateTime::from_timestamp(i64::try_from(secs).ok()?, nanos)
    }
}

impl Default for LeaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for LeaseId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identity of a queue message, stable across re-enqueues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Creates a new time-ordered message ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a message ID from a string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_ids_are_unique() {
        assert_ne!(LeaseId::new(), LeaseId::new());
    }

    #[test]
    fn test_lease_id_roundtrip_through_text() {
        let id = LeaseId::new();
        let parsed = LeaseId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_later_lease_id_sorts_after_earlier() {
        let first = LeaseId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = LeaseId::new();
        assert!(first < second);
        assert!(first.to_string() < second.to_string());
    }

    #[test]
    fn test_issued_at_is_close_to_now() {
        let before = Utc::now() - chrono::Duration::milliseconds(1);
        let issued = LeaseId::new().issued_at().unwrap();
        assert!(issued >= before && issued <= Utc::now());
    }

    #[test]
    fn test_issued_at_missing_for_non_v7() {
        assert!(LeaseId::from(Uuid::nil()).issued_at().is_none());
    }

    #[test]
    fn test_message_id_parse_rejects_garbage() {
        assert!(MessageId::parse("not-a-uuid").is_err());
    }
}
