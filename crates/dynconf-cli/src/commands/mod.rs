pub mod entries;
pub mod watch;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use dynconf_db_postgres::{PostgresConfigStore, mask_password};
use dynconf_reader::ConfigurationReader;
use dynconf_storage::DynConfigStore;

use crate::config::Settings;

/// A loaded reader together with the store behind it.
pub struct Session {
    pub reader: ConfigurationReader,
    pub store: DynConfigStore,
}

impl Session {
    /// Builds a reader over `store` using the reader settings.
    pub async fn open(
        settings: &Settings,
        store: DynConfigStore,
        auto_refresh: bool,
    ) -> Result<Self> {
        let reader = ConfigurationReader::builder()
            .application_name(settings.reader.application_name.clone())
            .store(store.clone())
            .refresh_interval(settings.reader.refresh_interval())
            .require_initial_load(settings.reader.require_initial_load)
            .auto_refresh(auto_refresh)
            .build()
            .await?;
        Ok(Self { reader, store })
    }

    /// Connects to PostgreSQL and builds a reader over it.
    pub async fn connect(settings: &Settings, auto_refresh: bool) -> Result<Self> {
        let store = PostgresConfigStore::new(settings.postgres.clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to {}",
                    mask_password(&settings.postgres.url)
                )
            })?;
        Self::open(settings, Arc::new(store), auto_refresh).await
    }
}
