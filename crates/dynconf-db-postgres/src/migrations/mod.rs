//! Database migration management for the PostgreSQL backing store.
//!
//! This module uses embedded migrations for single-binary deployment.

use sqlx_core::migrate::{Migration, MigrationType};
use sqlx_postgres::PgPool;
use std::borrow::Cow;
use tracing::{info, instrument};

use crate::error::Result;

/// Macro to define embedded migrations at compile time.
///
/// Each migration is a tuple of (version, description, sql).
macro_rules! embedded_migrations {
    () => {
        &[(
            20250101000001i64,
            "configuration_settings",
            include_str!("../../migrations/20250101000001_configuration_settings.sql"),
        )]
    };
}

/// Builds a vector of Migration structs from embedded migration data.
fn build_migrations() -> Vec<Migration> {
    embedded_migrations!()
        .iter()
        .map(|(version, description, sql)| Migration {
            version: *version,
            description: Cow::Borrowed(description),
            migration_type: MigrationType::Simple,
            sql: Cow::Borrowed(sql),
            checksum: Cow::Borrowed(&[]), // Empty checksum for embedded migrations
            no_tx: false,
        })
        .collect()
}

/// Runs all pending database migrations.
///
/// Applied versions are tracked in the `_sqlx_migrations` table, so running
/// this on every startup is safe.
///
/// # Errors
///
/// Returns an error if a migration fails to execute.
#[instrument(skip(pool))]
pub async fn run(pool: &PgPool) -> Result<()> {
    let migrations = build_migrations();
    info!(count = migrations.len(), "Running database migrations (embedded)");

    let migrator = sqlx_core::migrate::Migrator {
        migrations: Cow::Owned(migrations),
        ignore_missing: false,
        locking: true,
        no_tx: false,
    };

    migrator
        .run(pool)
        .await
        .map_err(|e| crate::error::PostgresError::Migration(format!("Migration failed: {e}")))?;

    info!("Database migrations completed successfully");

    Ok(())
}
