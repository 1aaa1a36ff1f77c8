use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use dynconf_reader::ValueKind;

#[derive(Parser)]
#[command(name = "dynconf")]
#[command(about = "Inspect and edit the configuration entries of one application")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to ./dynconf.toml when present)
    #[arg(short, long, global = true, env = "DYNCONF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application scope (overrides reader.application_name)
    #[arg(short, long, global = true)]
    pub app: Option<String>,

    /// PostgreSQL URL (overrides postgres.url)
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every active entry of the application
    List,
    /// Read one entry by name
    Get(GetArgs),
    /// Show the stored row for an id, active or not
    Show(IdArgs),
    /// Insert a new entry
    Insert(EntryArgs),
    /// Replace every field of an entry
    Update(UpdateArgs),
    /// Deactivate an entry (the row is kept)
    Delete(IdArgs),
    /// Keep refreshing and print the entries after each refresh
    Watch(WatchArgs),
    /// Print the effective settings
    Settings,
}

/// Target type for `get --as`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    Json,
}

impl From<ValueType> for ValueKind {
    fn from(value: ValueType) -> Self {
        match value {
            ValueType::String => ValueKind::String,
            ValueType::Int => ValueKind::Integer,
            ValueType::Float => ValueKind::Float,
            ValueType::Bool => ValueKind::Boolean,
            ValueType::Json => ValueKind::Json,
        }
    }
}

#[derive(clap::Args)]
pub struct GetArgs {
    /// Entry name (e.g. SiteName)
    pub name: String,
    /// Convert to this type instead of the declared one
    #[arg(long = "as")]
    pub as_type: Option<ValueType>,
}

#[derive(clap::Args)]
pub struct IdArgs {
    /// Entry id
    pub id: i64,
}

#[derive(clap::Args)]
pub struct EntryArgs {
    /// Entry name
    #[arg(long)]
    pub name: String,
    /// Declared type tag (e.g. string, int, bool)
    #[arg(long = "type")]
    pub value_type: String,
    /// Raw value
    #[arg(long, allow_hyphen_values = true)]
    pub value: String,
    /// Store the entry as inactive
    #[arg(long)]
    pub inactive: bool,
    /// Application the entry belongs to (defaults to --app)
    #[arg(long)]
    pub target_app: Option<String>,
}

#[derive(clap::Args)]
pub struct UpdateArgs {
    /// Entry id
    pub id: i64,
    #[command(flatten)]
    pub entry: EntryArgs,
}

#[derive(clap::Args)]
pub struct WatchArgs {
    /// Stop after this many refreshes (runs until Ctrl-C when omitted)
    #[arg(long)]
    pub ticks: Option<u64>,
}
