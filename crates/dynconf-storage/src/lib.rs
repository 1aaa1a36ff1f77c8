//! # dynconf-storage
//!
//! Backing-store abstraction for the dynconf configuration cache.
//!
//! This crate defines the traits and row types that every backing store must
//! implement. It does not contain any implementations - those are provided by
//! `dynconf-db-postgres` and `dynconf-db-memory`.
//!
//! ## Overview
//!
//! The main trait is [`ConfigStore`], which defines the contract for:
//! - Loading the active entries of one application scope
//! - Inserting an entry and returning the store-assigned id
//! - Rewriting every mutable field of an entry
//! - Soft-deleting an entry (the row is kept with `is_active = false`)
//!
//! ## Example
//!
//! ```ignore
//! use dynconf_storage::{ConfigStore, EntryFields, StorageError};
//!
//! async fn seed(store: &dyn ConfigStore) -> Result<i64, StorageError> {
//!     let fields = EntryFields::new("SiteName", "string", "Acme", "SERVICE-A");
//!     store.insert(&fields).await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::ConfigStore;
pub use types::{ConfigEntry, EntryFields};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shareable store trait object.
pub type DynConfigStore = std::sync::Arc<dyn ConfigStore>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::ConfigStore;
    pub use crate::types::{ConfigEntry, EntryFields};
    pub use crate::{DynConfigStore, StorageResult};
}
