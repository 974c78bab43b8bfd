//! The unified backup record every dialect is normalized into.
//!

use core::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::Lsn;

/// The node label used when a dialect does not record one.
pub const DEFAULT_NODE: &str = "localhost";

/// How a backup relates to earlier backups.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackupKind {
    #[default]
    Full,
    Incremental,
    Page,
    Delta,
    Ptrack,
}

impl BackupKind {
    /// The upper case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Incremental => "INCREMENTAL",
            Self::Page => "PAGE",
            Self::Delta => "DELTA",
            Self::Ptrack => "PTRACK",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The tool that produced a backup.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BackupTool {
    #[serde(rename = "pg_basebackup")]
    PgBasebackup,
    #[serde(rename = "pg_probackup")]
    PgProbackup,
    #[serde(rename = "pgBackRest")]
    PgBackRest,
}

impl BackupTool {
    /// The tool's own name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PgBasebackup => "pg_basebackup",
            Self::PgProbackup => "pg_probackup",
            Self::PgBackRest => "pgBackRest",
        }
    }
}

impl fmt::Display for BackupTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The state a backup was left in.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BackupStatus {
    #[default]
    Ok,
    Running,
    Corrupt,
    Error,
    Orphan,
    Warning,
}

impl BackupStatus {
    /// The upper case label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Running => "RUNNING",
            Self::Corrupt => "CORRUPT",
            Self::Error => "ERROR",
            Self::Orphan => "ORPHAN",
            Self::Warning => "WARNING",
        }
    }

    /// If validation is pointless for a backup in this state.
    pub fn skips_validation(self) -> bool {
        matches!(self, Self::Error | Self::Corrupt)
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backup, whatever tool made it.
///
/// Zero means unknown for the LSNs, the timeline and the engine version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    /// Identifier, unique within the producing tool.
    pub backup_id: String,

    /// The host the backup was taken from.
    pub node: String,

    /// pg_probackup instance or pgBackRest stanza.
    pub instance: Option<String>,

    #[allow(missing_docs)]
    pub kind: BackupKind,

    #[allow(missing_docs)]
    pub tool: BackupTool,

    #[allow(missing_docs)]
    pub status: BackupStatus,

    #[allow(missing_docs)]
    pub start_time: Option<DateTime<Utc>>,

    #[allow(missing_docs)]
    pub end_time: Option<DateTime<Utc>>,

    #[allow(missing_docs)]
    pub start_lsn: Lsn,

    #[allow(missing_docs)]
    pub stop_lsn: Lsn,

    #[allow(missing_docs)]
    pub timeline: u32,

    /// `major * 10000 + minor`.
    pub pg_version: u32,

    /// The version of the producing tool.
    pub tool_version: Option<String>,

    /// Identifier of the backup this one builds on.
    pub parent_backup_id: Option<String>,

    /// Where the backup lives on disk.
    pub path: PathBuf,

    #[allow(missing_docs)]
    pub data_bytes: u64,

    #[allow(missing_docs)]
    pub wal_bytes: u64,

    /// `BACKUP METHOD` from a backup label.
    pub backup_method: Option<String>,

    /// `BACKUP FROM` from a backup label.
    pub backup_from: Option<String>,

    /// The user supplied label.
    pub label: Option<String>,

    /// The WAL segment the backup starts in.
    pub wal_start_file: Option<String>,
}

impl BackupRecord {
    /// A record with every optional field unknown and status OK.
    pub fn new(tool: BackupTool, backup_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            backup_id: backup_id.into(),
            node: DEFAULT_NODE.to_string(),
            instance: None,
            kind: BackupKind::Full,
            tool,
            status: BackupStatus::Ok,
            start_time: None,
            end_time: None,
            start_lsn: Lsn::INVALID,
            stop_lsn: Lsn::INVALID,
            timeline: 0,
            pg_version: 0,
            tool_version: None,
            parent_backup_id: None,
            path: path.into(),
            data_bytes: 0,
            wal_bytes: 0,
            backup_method: None,
            backup_from: None,
            label: None,
            wal_start_file: None,
        }
    }

    /// A record for a backup whose metadata could not be read.
    pub fn failed(tool: BackupTool, path: &Path) -> Self {
        let mut record = Self::new(tool, directory_name(path), path);
        record.status = BackupStatus::Error;
        record
    }

    /// The directory holding the backup, used to group listings.
    pub fn parent_directory(&self) -> Option<&Path> {
        self.path.parent()
    }
}

/// The last component of `path`, or the whole path if it has none.
pub fn directory_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Encodes a `major[.minor]` server version as `major * 10000 + minor`.
///
/// Returns zero when the major version is not a number.
pub fn parse_server_version(value: &str) -> u32 {
    let value = value.trim();
    let (major, minor) = value.split_once('.').unwrap_or((value, "0"));

    let Ok(major) = major.trim().parse::<u32>() else {
        return 0;
    };
    let minor = leading_number(minor);

    major.saturating_mul(10_000).saturating_add(minor)
}

fn leading_number(value: &str) -> u32 {
    let digits: String = value.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}
