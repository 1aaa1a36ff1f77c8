//! In-memory backing store for the dynconf configuration cache.
//!
//! This crate provides an in-memory implementation of the `ConfigStore` trait
//! from `dynconf-storage`, using papaya lock-free HashMap for concurrent access.
//! It behaves like the relational table: ids are assigned by the store, soft
//! delete keeps the row, and the store can be switched unavailable to exercise
//! failure paths.
//!
//! # Example
//!
//! ```ignore
//! use dynconf_db_memory::InMemoryConfigStore;
//! use dynconf_storage::{ConfigStore, EntryFields};
//!
//! let store = InMemoryConfigStore::new();
//! let id = store
//!     .insert(&EntryFields::new("SiteName", "string", "Acme", "SERVICE-A"))
//!     .await?;
//! ```

mod storage;
mod store_impl;

pub use dynconf_storage::{ConfigStore, StorageError};
pub use storage::InMemoryConfigStore;

/// Creates a new shareable in-memory store.
pub fn create_config_store() -> std::sync::Arc<InMemoryConfigStore> {
    std::sync::Arc::new(InMemoryConfigStore::new())
}
