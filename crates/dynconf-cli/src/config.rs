use std::time::Duration;

use dynconf_db_postgres::{PostgresConfig, mask_password};
use serde::{Deserialize, Serialize};

/// Default settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "dynconf.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub reader: ReaderSettings,
    pub postgres: PostgresConfig,
    pub logging: LoggingSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        if self.reader.application_name.trim().is_empty() {
            return Err(
                "reader.application_name must be set (use --app or DYNCONF__READER__APPLICATION_NAME)"
                    .into(),
            );
        }
        if self.reader.refresh_interval_ms == 0 {
            return Err("reader.refresh_interval_ms must be > 0".into());
        }
        self.postgres
            .validate()
            .map_err(|e| format!("postgres: {e}"))?;
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    /// Copy safe to print: the database password is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.postgres.url = mask_password(&copy.postgres.url);
        copy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderSettings {
    /// Scope of the entries the reader mirrors.
    pub application_name: String,
    pub refresh_interval_ms: u64,
    /// Fail startup if the first load fails instead of starting empty.
    pub require_initial_load: bool,
}

impl ReaderSettings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            refresh_interval_ms: 5000,
            require_initial_load: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

/// Values from command-line flags, applied over every other source.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub application_name: Option<String>,
    pub database_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings build error: {0}")]
    Build(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

pub mod loader {
    use super::{DEFAULT_SETTINGS_FILE, Settings, SettingsError, SettingsOverrides};
    use config::{Config, Environment, File, Map};
    use std::path::Path;

    /// Loads settings from the optional file, `DYNCONF__*` environment
    /// variables and `overrides`, in increasing precedence.
    ///
    /// An explicitly given file must exist; the default `dynconf.toml` is
    /// only read when present.
    pub fn load_settings(
        path: Option<&Path>,
        overrides: &SettingsOverrides,
    ) -> Result<Settings, SettingsError> {
        load_settings_from(path, None, overrides)
    }

    /// Like [`load_settings`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_settings_from(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
        overrides: &SettingsOverrides,
    ) -> Result<Settings, SettingsError> {
        let mut builder = Config::builder();
        builder = match path {
            Some(p) => builder.add_source(File::from(p).required(true)),
            None => {
                builder.add_source(File::from(Path::new(DEFAULT_SETTINGS_FILE)).required(false))
            }
        };
        // Environment variable overrides, e.g. DYNCONF__READER__REFRESH_INTERVAL_MS=1000
        builder = builder.add_source(
            Environment::with_prefix("DYNCONF")
                .try_parsing(true)
                .separator("__")
                .source(env),
        );
        builder = builder
            .set_override_option("reader.application_name", overrides.application_name.clone())?
            .set_override_option("postgres.url", overrides.database_url.clone())?;

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate().map_err(SettingsError::Invalid)?;
        Ok(settings)
    }
}
