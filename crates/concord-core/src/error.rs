//! Unified error taxonomy for the coordination primitives.

use thiserror::Error;

/// Unified error type for Concord.
///
/// The variants split into three groups: expected coordination outcomes
/// (`LockContention`, `ConcurrencyConflict`), store faults that must always
/// reach the caller (`StoreUnavailable`, `Serialization`), and the usual
/// supporting errors.
#[derive(Error, Debug)]
pub enum ConcordError {
    // ============ Coordination Outcomes ============
    /// A live lease already exists for the named resource.
    #[error("Lock contention: lease for '{name}' is held by another worker")]
    LockContention { name: String },

    /// An optimistic write lost the race against another writer.
    #[error("Concurrency conflict on {resource} {id}")]
    ConcurrencyConflict { resource: &'static str, id: String },

    // ============ Store Errors ============
    /// The shared store could not be reached or rejected the statement.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Payload or task state could not be (de)serialized.
    #[error("Serialization error{}: {reason}", describe_id(.id))]
    Serialization { id: Option<String>, reason: String },

    // ============ Domain Errors ============
    /// Resource not found
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict error (e.g., duplicate entry)
    #[error("Conflict: {0}")]
    Conflict(String),

    // ============ Infrastructure Errors ============
    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe_id(id: &Option<String>) -> String {
    id.as_ref().map(|id| format!(" for {id}")).unwrap_or_default()
}

impl ConcordError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::LockContention { .. } => "LOCK_CONTENTION",
            Self::ConcurrencyConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Serialization { .. } => "SERIALIZATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates a lock contention error.
    #[must_use]
    pub fn lock_contention<T: Into<String>>(name: T) -> Self {
        Self::LockContention { name: name.into() }
    }

    /// Creates a not found error for a resource.
    #[must_use]
    pub fn not_found<T: ToString>(resource_type: &'static str, id: T) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// Creates a serialization error tied to a stored row.
    #[must_use]
    pub fn serialization<I: ToString, R: ToString>(id: I, reason: R) -> Self {
        Self::Serialization {
            id: Some(id.to_string()),
            reason: reason.to_string(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict<T: Into<String>>(message: T) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true for lease contention.
    #[must_use]
    pub const fn is_contention(&self) -> bool {
        matches!(self, Self::LockContention { .. })
    }

    /// Checks if the caller may retry the operation after a backoff.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::LockContention { .. }
                | Self::ConcurrencyConflict { .. }
                | Self::StoreUnavailable(_)
        )
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for ConcordError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound {
                resource_type: "database_row",
                id: "unknown".to_string(),
            },
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    return Self::Conflict(db_err.message().to_string());
                }
                if let Some(code) = db_err.code() {
                    // SQLite unique / primary key, PostgreSQL, MySQL
                    if code == "2067" || code == "1555" || code == "23505" || code == "1062" {
                        return Self::Conflict(db_err.message().to_string());
                    }
                }
                Self::StoreUnavailable(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Internal(format!("Row decode failed: {}", err))
            }
            _ => Self::StoreUnavailable(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConcordError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            id: None,
            reason: err.to_string(),
        }
    }
}
