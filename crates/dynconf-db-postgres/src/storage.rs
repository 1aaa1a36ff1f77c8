//! PostgreSQL implementation of the ConfigStore trait.

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use dynconf_storage::{ConfigEntry, ConfigStore, EntryFields, StorageError};

use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries;

/// PostgreSQL backing store for configuration entries.
#[derive(Debug, Clone)]
pub struct PostgresConfigStore {
    pool: PgPool,
}

impl PostgresConfigStore {
    /// Creates a new `PostgresConfigStore` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Creates a new `PostgresConfigStore` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ConfigStore for PostgresConfigStore {
    #[instrument(skip(self))]
    async fn query_active(
        &self,
        application_name: &str,
    ) -> Result<Vec<ConfigEntry>, StorageError> {
        let rows = queries::select_active(&self.pool, application_name).await?;
        debug!(rows = rows.len(), "Loaded active configuration rows");
        Ok(rows)
    }

    #[instrument(skip(self, fields), fields(name = %fields.name))]
    async fn insert(&self, fields: &EntryFields) -> Result<i64, StorageError> {
        queries::insert(&self.pool, fields).await
    }

    #[instrument(skip(self, fields))]
    async fn update(&self, id: i64, fields: &EntryFields) -> Result<u64, StorageError> {
        queries::update(&self.pool, id, fields).await
    }

    #[instrument(skip(self))]
    async fn soft_delete(&self, id: i64) -> Result<u64, StorageError> {
        queries::soft_delete(&self.pool, id).await
    }

    #[instrument(skip(self))]
    async fn fetch(&self, id: i64) -> Result<Option<ConfigEntry>, StorageError> {
        queries::select_by_id(&self.pool, id).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
