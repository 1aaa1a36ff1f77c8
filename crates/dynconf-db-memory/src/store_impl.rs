//! Implementation of the ConfigStore trait for InMemoryConfigStore.

use async_trait::async_trait;
use tracing::debug;

use dynconf_storage::{ConfigEntry, ConfigStore, EntryFields, StorageError};

use crate::storage::InMemoryConfigStore;

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn query_active(
        &self,
        application_name: &str,
    ) -> Result<Vec<ConfigEntry>, StorageError> {
        self.record_query();
        self.round_trip().await?;

        let mut rows: Vec<ConfigEntry> = {
            let guard = self.data.pin();
            guard
                .iter()
                .filter(|(_, row)| row.is_visible_to(application_name))
                .map(|(_, row)| row.clone())
                .collect()
        };
        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    async fn insert(&self, fields: &EntryFields) -> Result<i64, StorageError> {
        self.round_trip().await?;
        let id = self.insert_row(fields.clone());
        debug!(id, name = %fields.name, "Inserted in-memory config row");
        Ok(id)
    }

    async fn update(&self, id: i64, fields: &EntryFields) -> Result<u64, StorageError> {
        self.round_trip().await?;
        let guard = self.data.pin();
        let updated = guard
            .update(id, |old| ConfigEntry::from_fields(old.id, fields.clone()))
            .is_some();
        Ok(u64::from(updated))
    }

    async fn soft_delete(&self, id: i64) -> Result<u64, StorageError> {
        self.round_trip().await?;
        let guard = self.data.pin();
        let updated = guard
            .update(id, |old| ConfigEntry {
                is_active: false,
                ..old.clone()
            })
            .is_some();
        Ok(u64::from(updated))
    }

    async fn fetch(&self, id: i64) -> Result<Option<ConfigEntry>, StorageError> {
        self.round_trip().await?;
        let guard = self.data.pin();
        Ok(guard.get(&id).cloned())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
