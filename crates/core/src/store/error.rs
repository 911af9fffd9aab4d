//! Storage errors surfaced through the session interface.

use thiserror::Error;

/// Errors raised by a `LedgerStore` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation {
        /// Name of the violated constraint.
        constraint: String,
    },

    /// The database aborted the transaction because of a concurrent writer.
    #[error("Serialization conflict: {0}")]
    SerializationConflict(String),

    /// A write was attempted through a read-only session.
    #[error("Session is read-only")]
    ReadOnly,

    /// A row expected to exist was missing.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A stored value could not be mapped back into the domain.
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// Any other backend failure.
    #[error("Database error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UniqueViolation { .. } => "UNIQUE_VIOLATION",
            Self::SerializationConflict(_) => "SERIALIZATION_CONFLICT",
            Self::ReadOnly => "READ_ONLY_SESSION",
            Self::NotFound(_) => "RECORD_NOT_FOUND",
            Self::Corrupt(_) => "CORRUPT_RECORD",
            Self::Backend(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::UniqueViolation { .. } | Self::SerializationConflict(_) => 409,
            Self::NotFound(_) => 404,
            Self::ReadOnly | Self::Corrupt(_) | Self::Backend(_) => 500,
        }
    }

    /// Returns true if the whole unit of work may succeed on retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::SerializationConflict(_))
    }

    /// Returns true if this is a violation of the named constraint.
    #[must_use]
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, Self::UniqueViolation { constraint } if constraint == name)
    }
}
