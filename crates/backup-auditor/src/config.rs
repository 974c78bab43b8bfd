use core::time::Duration;
use std::{fs, io, path::PathBuf};

use serde::{Deserialize, Serialize};
use shared::{DEFAULT_WAL_SEGMENT_SIZE, LoggerConfig};
use thiserror::Error;
use tracing::Level;

use crate::{
    adapter::ScanOptions,
    validation::{RetentionPolicy, ValidationLevel, VerifyOptions},
};

/// The default location of the config file.
pub const DEFAULT_CONFIG_FILE: &str = "./pg-backup-auditor.toml";

/// Directory walk settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// How deep to descend below the root, `-1` for unlimited.
    pub max_depth: i64,

    /// WAL segment size in bytes.
    pub wal_segment_size: u64,
}

impl ScanConfig {
    /// `None` when the depth is unlimited.
    pub fn max_depth(&self) -> Option<usize> {
        usize::try_from(self.max_depth).ok()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: -1,
            wal_segment_size: DEFAULT_WAL_SEGMENT_SIZE,
        }
    }
}

/// Tar archive reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Upper bound on reading one member out of an archive.
    pub read_timeout_secs: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: 30,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub level: ValidationLevel,
}

/// Retention policy thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Run the retention check on every `check`.
    pub enabled: bool,
    #[allow(missing_docs)]
    pub days: u32,
    #[allow(missing_docs)]
    pub weekly: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        let policy = RetentionPolicy::default();
        Self {
            enabled: false,
            days: policy.days,
            weekly: policy.weekly,
        }
    }
}

/// The external verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    #[allow(missing_docs)]
    pub pg_verifybackup: PathBuf,
    #[allow(missing_docs)]
    pub timeout_secs: u64,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        let options = VerifyOptions::default();
        Self {
            pg_verifybackup: options.pg_verifybackup,
            timeout_secs: options.timeout.as_secs(),
        }
    }
}

/// Log verbosity.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,

    /// Directory for daily log files, empty disables file logging.
    pub directory: PathBuf,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

/// The auditor's config.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub archive: ArchiveConfig,
    pub validation: ValidationConfig,
    pub retention: RetentionConfig,
    pub verify: VerifyConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Tries to load a config from a toml file.
    pub fn load_toml(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        if !file_path.exists() {
            return Err(LoadConfigError::NoFile(file_path));
        }

        let contents = fs::read_to_string(file_path).map_err(LoadConfigError::Read)?;
        let config = toml::from_str(&contents)?;

        Ok(config)
    }

    /// Loads `file_path`, falling back to the defaults when it does not exist.
    pub fn load_or_default(file_path: PathBuf) -> Result<Self, LoadConfigError> {
        match Self::load_toml(file_path) {
            Err(LoadConfigError::NoFile(_)) => Ok(Self::default()),
            result => result,
        }
    }

    /// The default config as toml.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    #[allow(missing_docs)]
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            archive_read_timeout: Duration::from_secs(self.archive.read_timeout_secs),
        }
    }

    #[allow(missing_docs)]
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            days: self.retention.days,
            weekly: self.retention.weekly,
        }
    }

    #[allow(missing_docs)]
    pub fn verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            pg_verifybackup: self.verify.pg_verifybackup.clone(),
            timeout: Duration::from_secs(self.verify.timeout_secs),
        }
    }

    /// Logger settings, `verbose` forcing debug output.
    pub fn logger_config(&self, verbose: bool, color: bool) -> LoggerConfig {
        let level = if verbose {
            Level::DEBUG
        } else {
            self.logging.level.into()
        };

        let directory = (!self.logging.directory.as_os_str().is_empty())
            .then(|| self.logging.directory.clone());

        LoggerConfig {
            level,
            directory,
            ansi: color,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("The file does not exist: {0:?}")]
    NoFile(PathBuf),

    #[error("Failed to read the file:\n{0}")]
    Read(#[source] io::Error),

    #[error("Failed to deserialize the file:\n{0}")]
    Deserialize(#[from] toml::de::Error),
}
