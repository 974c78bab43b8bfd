//! The command line surface.
//!

use std::{io, path::PathBuf};

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::{
    config::{Config, DEFAULT_CONFIG_FILE},
    output::Style,
    scanner::ScanError,
};

mod check;
mod info;
mod init;
mod list;

pub use check::{CheckArgs, check};
pub use info::{InfoArgs, info, write_backup_info};
pub use init::init;
pub use list::{Format, Group, ListArgs, SortBy, StatusFilter, TypeFilter, list, select_groups};

/// Inventory and validate PostgreSQL physical backups.
#[derive(Debug, Parser)]
#[command(name = "pg-backup-auditor", version, about)]
pub struct Cli {
    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to the config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[allow(missing_docs)]
    #[command(subcommand)]
    pub command: Command,
}

#[allow(missing_docs)]
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the backups found below a directory.
    List(ListArgs),

    /// Show the details of one backup.
    Info(InfoArgs),

    /// Validate backups and, optionally, a WAL archive.
    Check(CheckArgs),

    /// Write a default config file.
    Init,
}

/// Process exit codes.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    ValidationFailed,
    NoBackupsFound,
    InvalidArguments,
}

impl ExitCode {
    /// The numeric process exit code.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::GeneralError => 1,
            Self::ValidationFailed => 2,
            Self::NoBackupsFound => 3,
            Self::InvalidArguments => 4,
        }
    }
}

/// Runs the parsed command, writing its report to `out`.
pub fn run(
    cli: &Cli,
    config: &Config,
    style: Style,
    out: &mut dyn io::Write,
) -> Result<ExitCode, CommandError> {
    match &cli.command {
        Command::List(args) => list(args, config, style, out),
        Command::Info(args) => info(args, config, style, out),
        Command::Check(args) => check(args, config, style, out),
        Command::Init => init(&cli.config, out),
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("No backups found in {0:?}")]
    NoBackupsFound(PathBuf),

    #[error("Backup with ID '{0}' not found")]
    BackupNotFound(String),

    #[error("No backup found at: {0:?}")]
    NoBackupAtPath(PathBuf),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Failed to write output:\n{0}")]
    Write(#[from] io::Error),

    #[error("Failed to serialize output:\n{0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Config file already exists: {0:?}")]
    ConfigExists(PathBuf),

    #[error("Failed to serialize the config:\n{0}")]
    SerializeConfig(#[from] toml::ser::Error),

    #[error("Failed to write the config {0:?}:\n{1}")]
    WriteConfig(PathBuf, #[source] io::Error),
}

impl CommandError {
    /// The exit code this error ends the process with.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidArguments(_) => ExitCode::InvalidArguments,
            Self::NoBackupsFound(_) | Self::BackupNotFound(_) | Self::NoBackupAtPath(_) => {
                ExitCode::NoBackupsFound
            }
            _ => ExitCode::GeneralError,
        }
    }
}
