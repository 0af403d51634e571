//! Queue message state value object.

use crate::ConcordError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery state of a queue message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Waiting on an active queue.
    #[default]
    New,
    /// Claimed by a consumer; retained as history until acknowledged.
    Dequeued,
    /// Rerouted to a dead-letter queue.
    Poison,
}

impl MessageState {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Dequeued => "dequeued",
            Self::Poison => "poison",
        }
    }

    /// State in which a message can be claimed from a queue of the given role.
    #[must_use]
    pub const fn claimable_for(poison_queue: bool) -> Self {
        if poison_queue {
            Self::Poison
        } else {
            Self::New
        }
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageState {
    type Err = ConcordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "dequeued" => Ok(Self::Dequeued),
            "poison" => Ok(Self::Poison),
            other => Err(ConcordError::Internal(format!("Unknown message state: {other}"))),
        }
    }
}
