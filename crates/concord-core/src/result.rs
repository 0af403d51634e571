//! Result type aliases for Concord.

use crate::ConcordError;

/// A specialized `Result` type for Concord operations.
pub type ConcordResult<T> = Result<T, ConcordError>;
