use std::collections::BTreeMap;

use colored::Colorize;
use dynconf_reader::{ConfigEntry, ReloadStatus, TypedValue};
use serde_json::json;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn render_entries(entries: &BTreeMap<i64, ConfigEntry>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let list: Vec<&ConfigEntry> = entries.values().collect();
            to_pretty_json(&list)
        }
        OutputFormat::Table => {
            if entries.is_empty() {
                return "No entries found.".to_string();
            }
            entries_table(entries.values())
        }
    }
}

pub fn render_entry(entry: &ConfigEntry, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_pretty_json(entry),
        OutputFormat::Table => entries_table(std::iter::once(entry)),
    }
}

pub fn render_value(name: &str, value: &TypedValue, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_pretty_json(&json!({ "name": name, "value": value })),
        OutputFormat::Table => value.to_string(),
    }
}

/// One line per refresh, or a JSON object with the status and entries.
pub fn render_tick(
    status: &ReloadStatus,
    entries: &BTreeMap<i64, ConfigEntry>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => {
            let list: Vec<&ConfigEntry> = entries.values().collect();
            serde_json::to_string(&json!({ "status": status, "entries": list }))
                .unwrap_or_default()
        }
        OutputFormat::Table => {
            let mut line = format!(
                "{} reloads={} entries={} state={}",
                "refresh".cyan(),
                status.reload_count,
                entries.len(),
                status.state
            );
            if let Some(error) = &status.last_error {
                line.push_str(&format!(" {} {}", "last_error:".yellow(), error));
            }
            line
        }
    }
}

fn entries_table<'a>(entries: impl Iterator<Item = &'a ConfigEntry>) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Name", "Type", "Value", "Active", "Application"]);
    for entry in entries {
        builder.push_record([
            entry.id.to_string(),
            entry.name.clone(),
            entry.value_type.clone(),
            entry.value.clone(),
            entry.is_active.to_string(),
            entry.application_name.clone(),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
