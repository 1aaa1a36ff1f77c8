//! Error types for the PostgreSQL backing store.

use dynconf_storage::StorageError;
use sqlx_core::error::Error as SqlxError;

/// PostgreSQL error code for undefined table (42P01).
pub const PG_UNDEFINED_TABLE: &str = "42P01";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Checks if a sqlx error is "undefined table" (42P01).
pub fn is_undefined_table(err: &SqlxError) -> bool {
    has_pg_error_code(err, PG_UNDEFINED_TABLE)
}

/// Returns `true` if the error means the database could not be reached.
pub fn is_connectivity(err: &SqlxError) -> bool {
    matches!(
        err,
        SqlxError::Io(_)
            | SqlxError::Tls(_)
            | SqlxError::PoolTimedOut
            | SqlxError::PoolClosed
            | SqlxError::WorkerCrashed
    )
}

/// Errors specific to the PostgreSQL backing store.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection or statement error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => map_sqlx_error("connect", e),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
            PostgresError::Config { message } => {
                StorageError::internal(format!("Configuration error: {message}"))
            }
        }
    }
}

/// Converts a sqlx error from a store call into a `StorageError`.
///
/// Unreachable databases become `ConnectionError`; a missing table is an
/// internal error (migrations were not run); anything else the database
/// rejected is a `WriteRejected`.
pub fn map_sqlx_error(operation: &str, err: SqlxError) -> StorageError {
    if is_connectivity(&err) {
        StorageError::connection_error(format!("{operation} failed: {err}"))
    } else if is_undefined_table(&err) {
        StorageError::internal(format!(
            "{operation} failed: configuration table is missing ({err})"
        ))
    } else if matches!(err, SqlxError::Database(_)) {
        StorageError::write_rejected(format!("{operation} failed: {err}"))
    } else {
        StorageError::internal(format!("{operation} failed: {err}"))
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));

        let err = PostgresError::Migration("checksum mismatch".into());
        assert!(err.to_string().contains("Migration error"));
    }

    #[test]
    fn test_conversion_to_storage_error() {
        let pg_err = PostgresError::config("test error");
        let storage_err: StorageError = pg_err.into();
        assert!(matches!(storage_err, StorageError::Internal { .. }));
    }

    #[test]
    fn test_pool_timeout_is_connectivity() {
        let err = map_sqlx_error("query_active", SqlxError::PoolTimedOut);
        assert!(err.is_connection_error());
        assert!(err.to_string().contains("query_active failed"));

        let err = map_sqlx_error("insert", SqlxError::RowNotFound);
        assert!(matches!(err, StorageError::Internal { .. }));
    }
}
