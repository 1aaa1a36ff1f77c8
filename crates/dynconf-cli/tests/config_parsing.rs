use std::fs;

use config::Map;
use dynconf_cli::config::loader::load_settings_from;
use dynconf_cli::config::{SettingsError, SettingsOverrides};

const SETTINGS: &str = r#"
[reader]
application_name = "SERVICE-A"
refresh_interval_ms = 1500
require_initial_load = true

[postgres]
url = "postgres://app:secret@db:5432/config"
pool_size = 3

[logging]
level = "debug"
"#;

fn env(vars: &[(&str, &str)]) -> Option<Map<String, String>> {
    let mut map = Map::new();
    for (key, value) in vars {
        map.insert(key.to_string(), value.to_string());
    }
    Some(map)
}

#[test]
fn settings_file_parses_with_defaults_for_missing_keys() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("dynconf.toml");
    fs::write(&path, SETTINGS).expect("write toml");

    let settings = load_settings_from(Some(&path), env(&[]), &SettingsOverrides::default())
        .expect("should parse settings");

    assert_eq!(settings.reader.application_name, "SERVICE-A");
    assert_eq!(settings.reader.refresh_interval_ms, 1500);
    assert!(settings.reader.require_initial_load);
    assert_eq!(settings.postgres.pool_size, 3);
    assert_eq!(settings.postgres.connect_timeout_ms, 5000);
    assert!(settings.postgres.run_migrations);
    assert_eq!(settings.logging.level, "debug");
}

#[test]
fn env_overrides_file_and_flags_override_env() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("dynconf.toml");
    fs::write(&path, SETTINGS).expect("write toml");

    let vars = env(&[
        ("DYNCONF__READER__REFRESH_INTERVAL_MS", "250"),
        ("DYNCONF__READER__APPLICATION_NAME", "SERVICE-B"),
    ]);
    let settings = load_settings_from(Some(&path), vars.clone(), &SettingsOverrides::default())
        .expect("env overrides should apply");
    assert_eq!(settings.reader.refresh_interval_ms, 250);
    assert_eq!(settings.reader.application_name, "SERVICE-B");

    let overrides = SettingsOverrides {
        application_name: Some("SERVICE-C".into()),
        database_url: Some("postgres://localhost/other".into()),
    };
    let settings = load_settings_from(Some(&path), vars, &overrides).expect("flags should apply");
    assert_eq!(settings.reader.application_name, "SERVICE-C");
    assert_eq!(settings.postgres.url, "postgres://localhost/other");
}

#[test]
fn env_alone_is_enough() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").expect("write toml");

    let settings = load_settings_from(
        Some(&path),
        env(&[("DYNCONF__READER__APPLICATION_NAME", "SERVICE-A")]),
        &SettingsOverrides::default(),
    )
    .expect("defaults plus env should validate");
    assert_eq!(settings.reader.refresh_interval_ms, 5000);
    assert_eq!(settings.logging.level, "warn");
}

#[test]
fn invalid_settings_are_rejected() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("dynconf.toml");
    fs::write(&path, "[reader]\nrefresh_interval_ms = 1000\n").expect("write toml");

    let err = load_settings_from(Some(&path), env(&[]), &SettingsOverrides::default())
        .expect_err("missing application should fail");
    assert!(matches!(err, SettingsError::Invalid(ref msg) if msg.contains("application_name")));

    fs::write(
        &path,
        "[reader]\napplication_name = \"SERVICE-A\"\nrefresh_interval_ms = 0\n",
    )
    .expect("write toml");
    let err = load_settings_from(Some(&path), env(&[]), &SettingsOverrides::default())
        .expect_err("zero interval should fail");
    assert!(matches!(err, SettingsError::Invalid(_)));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let overrides = SettingsOverrides {
        application_name: Some("SERVICE-A".into()),
        database_url: None,
    };
    let err = load_settings_from(Some(&path), env(&[]), &overrides)
        .expect_err("missing explicit file should fail");
    assert!(matches!(err, SettingsError::Build(_)));
}
