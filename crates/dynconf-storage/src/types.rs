//! Row types shared by every backing store.

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// The mutable column set of a configuration entry.
///
/// Insert and update both take the full set; partial updates are not
/// supported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFields {
    /// Human-readable key, intended unique within an active application scope.
    pub name: String,
    /// Declared logical type tag. A hint only, never enforced.
    #[serde(rename = "type")]
    pub value_type: String,
    /// Raw textual value.
    pub value: String,
    /// Soft-delete flag.
    pub is_active: bool,
    /// Scope discriminator.
    pub application_name: String,
}

impl EntryFields {
    /// Creates an active entry.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value_type: impl Into<String>,
        value: impl Into<String>,
        application_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
            value: value.into(),
            is_active: true,
            application_name: application_name.into(),
        }
    }

    /// Sets the active flag.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Checks that every required field is present.
    ///
    /// `name`, `type` and `application_name` must contain a non-whitespace
    /// character. `value` may be empty.
    pub fn validate(&self) -> Result<(), StorageError> {
        for (field, value) in [
            ("name", &self.name),
            ("type", &self.value_type),
            ("application_name", &self.application_name),
        ] {
            if value.trim().is_empty() {
                return Err(StorageError::invalid_entry(format!(
                    "{field} must not be blank"
                )));
            }
        }
        Ok(())
    }
}

/// One configuration setting as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Store-assigned identity.
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: String,
    pub value: String,
    pub is_active: bool,
    pub application_name: String,
}

impl ConfigEntry {
    /// Builds an entry from a store id and its fields.
    #[must_use]
    pub fn from_fields(id: i64, fields: EntryFields) -> Self {
        Self {
            id,
            name: fields.name,
            value_type: fields.value_type,
            value: fields.value,
            is_active: fields.is_active,
            application_name: fields.application_name,
        }
    }

    /// Returns a copy of the mutable fields.
    #[must_use]
    pub fn fields(&self) -> EntryFields {
        EntryFields {
            name: self.name.clone(),
            value_type: self.value_type.clone(),
            value: self.value.clone(),
            is_active: self.is_active,
            application_name: self.application_name.clone(),
        }
    }

    /// Returns `true` if a reader bound to `application_name` may see this entry.
    #[must_use]
    pub fn is_visible_to(&self, application_name: &str) -> bool {
        self.is_active && self.application_name == application_name
    }
}
