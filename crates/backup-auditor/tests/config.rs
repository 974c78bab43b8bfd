//! Tests for loading the config
//!

use core::time::Duration;

use backup_auditor::{
    Config, LoadConfigError,
    validation::{RetentionPolicy, ValidationLevel},
};
use common::write;
use tempfile::TempDir;
use tracing::Level;

mod common;

#[test]
fn default_toml_round_trips() {
    let toml = Config::default_toml().unwrap();
    let config: Config = toml::from_str(&toml).unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn defaults() {
    let config = Config::default();

    assert_eq!(config.scan.max_depth(), None);
    assert_eq!(config.validation.level, ValidationLevel::Standard);
    assert_eq!(config.retention_policy(), RetentionPolicy { days: 7, weekly: 4 });
    assert!(!config.retention.enabled);
    assert_eq!(config.scan_options().archive_read_timeout, Duration::from_secs(30));
    assert_eq!(config.verify_options().timeout, Duration::from_secs(300));
    assert!(config.output.color);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("auditor.toml");
    write(
        &path,
        "[scan]\nmax_depth = 2\n\n[validation]\nlevel = \"full\"\n\n[logging]\nlevel = \"info\"\n",
    );

    let config = Config::load_toml(path).unwrap();

    assert_eq!(config.scan.max_depth(), Some(2));
    assert_eq!(config.validation.level, ValidationLevel::Full);
    assert_eq!(config.logger_config(false, false).level, Level::INFO);
    assert_eq!(config.retention, Config::default().retention);
}

#[test]
fn verbose_forces_debug() {
    let logger = Config::default().logger_config(true, true);

    assert_eq!(logger.level, Level::DEBUG);
    assert!(logger.ansi);
    assert!(logger.directory.is_none());
}

#[test]
fn missing_file() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("absent.toml");

    assert!(matches!(
        Config::load_toml(path.clone()),
        Err(LoadConfigError::NoFile(_))
    ));
    assert_eq!(Config::load_or_default(path).unwrap(), Config::default());
}

#[test]
fn invalid_file() {
    let root = TempDir::new().unwrap();
    let path = root.path().join("auditor.toml");
    write(&path, "[validation]\nlevel = \"paranoid\"\n");

    assert!(matches!(
        Config::load_or_default(path),
        Err(LoadConfigError::Deserialize(_))
    ));
}
