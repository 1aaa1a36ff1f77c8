//! Periodically refreshed configuration cache for dynconf.
//!
//! A [`ConfigurationReader`] mirrors the active configuration rows of one
//! application scope into memory and keeps them fresh:
//! - Loads the scope once before the reader is handed out
//! - Reloads it on a fixed delay from a task owned by the reader
//! - Serves typed lookups from an immutable snapshot without locking
//! - Writes inserts, updates and soft deletes through to the store, then
//!   mirrors them into the cache
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  ConfigurationReader                      │
//! │                                                           │
//! │  get_value / get_all ──► EntryCache (ArcSwap snapshot)    │
//! │                               ▲            ▲              │
//! │                      replace_all       set / remove       │
//! │                               │            │              │
//! │  refresh task ──► reload ─────┘   insert / update / delete│
//! │                      │                     │              │
//! └──────────────────────┼─────────────────────┼──────────────┘
//!                        ▼                     ▼
//!                     ConfigStore (PostgreSQL, memory)
//! ```

pub mod cache;
pub mod convert;
pub mod reader;
mod refresh;

use std::fmt;

pub use cache::{CacheSnapshot, EntryCache};
pub use convert::{ConfigValue, TypedValue, ValueKind};
pub use reader::{
    ConfigurationReader, ConfigurationReaderBuilder, ReaderState, ReloadOutcome, ReloadStatus,
};

pub use dynconf_storage::{ConfigEntry, ConfigStore, DynConfigStore, EntryFields};

use dynconf_storage::StorageError;

/// How an entry was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKey {
    /// Mutation identity.
    Id(i64),
    /// Typed-read key.
    Name(String),
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name '{name}'"),
        }
    }
}

/// Error types for reader operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Entry not found: {0}")]
    NotFound(EntryKey),

    #[error("Cannot convert value {value:?} of '{name}' to {target}")]
    Conversion {
        name: String,
        target: &'static str,
        value: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),
}

impl ConfigError {
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    pub fn not_found_id(id: i64) -> Self {
        Self::NotFound(EntryKey::Id(id))
    }

    pub fn not_found_name(name: impl Into<String>) -> Self {
        Self::NotFound(EntryKey::Name(name.into()))
    }

    pub fn conversion(
        name: impl Into<String>,
        target: &'static str,
        value: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            name: name.into(),
            target,
            value: value.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn write_failure(msg: impl Into<String>) -> Self {
        Self::WriteFailure(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }

    /// Returns the error category, which a transport layer maps to a response.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Connectivity(_) => ErrorCategory::Connectivity,
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Conversion { .. } => ErrorCategory::Conversion,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::WriteFailure(_) => ErrorCategory::WriteFailure,
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id } => Self::not_found_id(id),
            StorageError::InvalidEntry { message } => Self::Validation(message),
            StorageError::ConnectionError { message } => Self::Connectivity(message),
            StorageError::WriteRejected { message } | StorageError::Internal { message } => {
                Self::WriteFailure(message)
            }
        }
    }
}

/// Categories of reader errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Entry absent, inactive or out of scope. Maps to a not-found response.
    NotFound,
    /// Missing or blank required field. Maps to a bad-request response.
    Validation,
    /// Stored value does not parse as the requested type.
    Conversion,
    /// Store unreachable. Maps to a server-failure response.
    Connectivity,
    /// Store did not persist the write. Maps to a server-failure response.
    WriteFailure,
}

impl ErrorCategory {
    /// Returns `true` when the caller, not the system, is at fault.
    pub fn is_client_error(self) -> bool {
        matches!(self, Self::NotFound | Self::Validation | Self::Conversion)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Validation => write!(f, "validation"),
            Self::Conversion => write!(f, "conversion"),
            Self::Connectivity => write!(f, "connectivity"),
            Self::WriteFailure => write!(f, "write_failure"),
        }
    }
}

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, ConfigError>;
