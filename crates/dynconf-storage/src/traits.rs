//! Storage traits for the backing-store abstraction layer.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{ConfigEntry, EntryFields};

/// The contract every configuration backing store implements.
///
/// Implementations must be thread-safe (`Send + Sync`). Each call is one
/// round trip; there are no retries at this layer.
///
/// # Example
///
/// ```ignore
/// use dynconf_storage::{ConfigStore, StorageError};
///
/// async fn count(store: &dyn ConfigStore) -> Result<usize, StorageError> {
///     Ok(store.query_active("SERVICE-A").await?.len())
/// }
/// ```
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Returns the active entries of one application scope, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::ConnectionError` if the backend is unreachable.
    async fn query_active(&self, application_name: &str)
    -> Result<Vec<ConfigEntry>, StorageError>;

    /// Inserts a new entry and returns the id the store assigned to it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::WriteRejected` if the store did not return an id.
    async fn insert(&self, fields: &EntryFields) -> Result<i64, StorageError>;

    /// Rewrites every mutable field of the entry with the given id.
    ///
    /// Returns the number of rows affected; `0` means the id does not exist.
    async fn update(&self, id: i64, fields: &EntryFields) -> Result<u64, StorageError>;

    /// Marks the entry inactive. The row itself is kept.
    ///
    /// Returns the number of rows affected; `0` means the id does not exist.
    async fn soft_delete(&self, id: i64) -> Result<u64, StorageError>;

    /// Reads one row by id regardless of its active flag or scope.
    async fn fetch(&self, id: i64) -> Result<Option<ConfigEntry>, StorageError>;

    /// Returns the name of this backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
