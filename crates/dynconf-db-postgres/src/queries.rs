//! SQL statements against the `configuration_settings` table.
//!
//! Every statement is parameterized; no value is ever interpolated into SQL.

use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;

use dynconf_storage::{ConfigEntry, EntryFields, StorageError};

use crate::error::map_sqlx_error;

/// Column tuple as selected from the table.
type EntryRow = (i64, String, String, String, bool, String);

const SELECT_ACTIVE: &str = r#"
    SELECT id, name, type, value, is_active, application_name
    FROM configuration_settings
    WHERE is_active = TRUE AND application_name = $1
    ORDER BY id
"#;

const SELECT_BY_ID: &str = r#"
    SELECT id, name, type, value, is_active, application_name
    FROM configuration_settings
    WHERE id = $1
"#;

const INSERT_ENTRY: &str = r#"
    INSERT INTO configuration_settings (name, type, value, is_active, application_name)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id
"#;

const UPDATE_ENTRY: &str = r#"
    UPDATE configuration_settings
    SET name = $1, type = $2, value = $3, is_active = $4, application_name = $5
    WHERE id = $6
"#;

const SOFT_DELETE_ENTRY: &str = r#"
    UPDATE configuration_settings
    SET is_active = FALSE
    WHERE id = $1
"#;

fn row_to_entry(
    (id, name, value_type, value, is_active, application_name): EntryRow,
) -> ConfigEntry {
    ConfigEntry {
        id,
        name,
        value_type,
        value,
        is_active,
        application_name,
    }
}

/// Loads the active rows of one application scope.
pub async fn select_active(
    pool: &PgPool,
    application_name: &str,
) -> Result<Vec<ConfigEntry>, StorageError> {
    let rows: Vec<EntryRow> = query_as(SELECT_ACTIVE)
        .bind(application_name)
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error("query_active", e))?;

    Ok(rows.into_iter().map(row_to_entry).collect())
}

/// Loads one row by id regardless of scope or activity.
pub async fn select_by_id(pool: &PgPool, id: i64) -> Result<Option<ConfigEntry>, StorageError> {
    let row: Option<EntryRow> = query_as(SELECT_BY_ID)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| map_sqlx_error("fetch", e))?;

    Ok(row.map(row_to_entry))
}

/// Inserts a row and returns the generated id.
pub async fn insert(pool: &PgPool, fields: &EntryFields) -> Result<i64, StorageError> {
    let id: Option<i64> = query_scalar(INSERT_ENTRY)
        .bind(&fields.name)
        .bind(&fields.value_type)
        .bind(&fields.value)
        .bind(fields.is_active)
        .bind(&fields.application_name)
        .fetch_optional(pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

    id.ok_or_else(|| StorageError::write_rejected("insert returned no id"))
}

/// Rewrites every mutable column of a row. Returns rows affected.
pub async fn update(pool: &PgPool, id: i64, fields: &EntryFields) -> Result<u64, StorageError> {
    let result = query(UPDATE_ENTRY)
        .bind(&fields.name)
        .bind(&fields.value_type)
        .bind(&fields.value)
        .bind(fields.is_active)
        .bind(&fields.application_name)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

    Ok(result.rows_affected())
}

/// Clears the active flag of a row. Returns rows affected.
pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<u64, StorageError> {
    let result = query(SOFT_DELETE_ENTRY)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("soft_delete", e))?;

    Ok(result.rows_affected())
}
