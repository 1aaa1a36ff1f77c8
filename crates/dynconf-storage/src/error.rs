//! Storage error types for the backing-store abstraction layer.
//!
//! This module defines all error types that can occur during store operations.

use std::fmt;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entry row does not exist.
    #[error("Entry not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: i64,
    },

    /// The entry data was rejected before or by the store.
    #[error("Invalid entry: {message}")]
    InvalidEntry {
        /// Description of why the entry is invalid.
        message: String,
    },

    /// The store accepted the statement but did not persist anything.
    #[error("Write rejected: {message}")]
    WriteRejected {
        /// Description of the rejected write.
        message: String,
    },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(id: i64) -> Self {
        Self::NotFound { id }
    }

    /// Creates a new `InvalidEntry` error.
    #[must_use]
    pub fn invalid_entry(message: impl Into<String>) -> Self {
        Self::InvalidEntry {
            message: message.into(),
        }
    }

    /// Creates a new `WriteRejected` error.
    #[must_use]
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::WriteRejected {
            message: message.into(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the backend could not be reached.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionError { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::InvalidEntry { .. } => ErrorCategory::Validation,
            Self::WriteRejected { .. } => ErrorCategory::Write,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Row not found.
    NotFound,
    /// Validation error.
    Validation,
    /// Write did not take effect.
    Write,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Write => write!(f, "write"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::not_found(42);
        assert_eq!(err.to_string(), "Entry not found: 42");

        let err = StorageError::connection_error("pool timed out");
        assert_eq!(err.to_string(), "Connection error: pool timed out");

        let err = StorageError::write_rejected("no id returned");
        assert_eq!(err.to_string(), "Write rejected: no id returned");
    }

    #[test]
    fn test_error_predicates() {
        let err = StorageError::not_found(1);
        assert!(err.is_not_found());
        assert!(!err.is_connection_error());

        let err = StorageError::connection_error("refused");
        assert!(!err.is_not_found());
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StorageError::not_found(7).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            StorageError::invalid_entry("blank name").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            StorageError::connection_error("down").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Write.to_string(), "write");
    }
}
