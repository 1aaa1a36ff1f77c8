use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use dynconf_cli::cli::{Cli, Commands};
use dynconf_cli::commands::{self, Session};
use dynconf_cli::config::{SettingsError, SettingsOverrides, loader};
use dynconf_cli::observability;
use dynconf_cli::output::{print_error, print_success};
use dynconf_reader::{ConfigError, ErrorCategory};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present; a missing file is not an error.
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("{e:#}"));
            ExitCode::from(exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = SettingsOverrides {
        application_name: cli.app.clone(),
        database_url: cli.database_url.clone(),
    };
    let settings = loader::load_settings(cli.config.as_deref(), &overrides)?;
    observability::apply_logging_level(&settings.logging.level);
    let format = cli.format.unwrap_or_default();

    if let Commands::Settings = cli.command {
        println!("{}", toml::to_string_pretty(&settings.redacted())?);
        return Ok(());
    }

    let auto_refresh = matches!(cli.command, Commands::Watch(_));
    let session = Session::connect(&settings, auto_refresh).await?;
    let reader = &session.reader;

    match &cli.command {
        Commands::List => println!("{}", commands::entries::list(reader, format)),
        Commands::Get(args) => {
            println!(
                "{}",
                commands::entries::get(reader, &args.name, args.as_type, format)?
            );
        }
        Commands::Show(args) => {
            println!(
                "{}",
                commands::entries::show(session.store.as_ref(), args.id, format).await?
            );
        }
        Commands::Insert(args) => print_success(&commands::entries::insert(reader, args).await?),
        Commands::Update(args) => {
            print_success(&commands::entries::update(reader, args.id, &args.entry).await?);
        }
        Commands::Delete(args) => print_success(&commands::entries::delete(reader, args.id).await?),
        Commands::Watch(args) => commands::watch::watch(reader, args.ticks, format).await?,
        Commands::Settings => {}
    }

    Ok(())
}

/// 2 for settings problems, 3 for missing entries, 4 for rejected input.
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<SettingsError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<ConfigError>().map(ConfigError::category) {
        Some(ErrorCategory::NotFound) => 3,
        Some(ErrorCategory::Validation | ErrorCategory::Conversion) => 4,
        _ => 1,
    }
}
