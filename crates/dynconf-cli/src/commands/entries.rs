use anyhow::Result;
use colored::Colorize;
use dynconf_reader::{ConfigError, ConfigurationReader, EntryFields, ValueKind};
use dynconf_storage::ConfigStore;

use crate::cli::{EntryArgs, OutputFormat, ValueType};
use crate::output::{render_entries, render_entry, render_value};

fn fields_from(args: &EntryArgs, reader: &ConfigurationReader) -> EntryFields {
    let application = args
        .target_app
        .clone()
        .unwrap_or_else(|| reader.application_name().to_string());
    EntryFields::new(&args.name, &args.value_type, &args.value, application)
        .with_active(!args.inactive)
}

pub fn list(reader: &ConfigurationReader, format: OutputFormat) -> String {
    render_entries(&reader.get_all(), format)
}

pub fn get(
    reader: &ConfigurationReader,
    name: &str,
    as_type: Option<ValueType>,
    format: OutputFormat,
) -> Result<String> {
    let value = match as_type {
        Some(target) => reader.get_as(name, ValueKind::from(target))?,
        None => reader.get_typed(name)?,
    };
    Ok(render_value(name, &value, format))
}

/// Reads the row straight from the store, bypassing the cache.
pub async fn show(store: &dyn ConfigStore, id: i64, format: OutputFormat) -> Result<String> {
    let entry = store
        .fetch(id)
        .await
        .map_err(ConfigError::from)?
        .ok_or_else(|| ConfigError::not_found_id(id))?;
    Ok(render_entry(&entry, format))
}

pub async fn insert(reader: &ConfigurationReader, args: &EntryArgs) -> Result<String> {
    let id = reader.insert_value(fields_from(args, reader)).await?;
    Ok(format!("Inserted {} with id {}", args.name.cyan(), id.to_string().cyan()))
}

pub async fn update(reader: &ConfigurationReader, id: i64, args: &EntryArgs) -> Result<String> {
    reader.update_value(id, fields_from(args, reader)).await?;
    Ok(format!("Updated {} ({})", args.name.cyan(), id.to_string().cyan()))
}

pub async fn delete(reader: &ConfigurationReader, id: i64) -> Result<String> {
    reader.delete(id).await?;
    Ok(format!("Deleted entry {}", id.to_string().cyan()))
}
