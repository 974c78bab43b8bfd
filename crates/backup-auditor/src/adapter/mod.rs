//! Format adapters that recognize and parse each tool's on-disk metadata.
//!

use core::{fmt::Debug, time::Duration};
use std::{fs, path::Path};

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};

mod archive;
mod pg_basebackup;
mod pg_probackup;
mod pgbackrest;

pub use archive::{ArchiveError, Compression, read_member};
pub use pg_basebackup::{BasebackupError, PgBasebackup, directory_size, parse_backup_label};
pub use pg_probackup::{CONTROL_FILE, PgProbackup, ProbackupError};
pub use pgbackrest::{CATALOG_FILE, MANIFEST_FILE, PgBackRest};

use crate::record::{BackupRecord, BackupTool};

/// Settings that affect how backups are read.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Upper bound on reading a single member out of a tar archive.
    pub archive_read_timeout: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            archive_read_timeout: Duration::from_secs(30),
        }
    }
}

/// A backup dialect.
pub trait BackupAdapter: Debug {
    /// The adapter's name.
    fn name(&self) -> &'static str;

    /// The tool whose backups this adapter reads.
    fn tool(&self) -> BackupTool;

    /// If `path` holds a backup or repository in this dialect.
    fn detect(&self, path: &Path) -> bool;

    /// Parse the backups at `path`.
    ///
    /// Never fails. A backup whose metadata cannot be read is returned with
    /// status ERROR and a repository may yield any number of records.
    fn scan(&self, path: &Path, options: &ScanOptions) -> Vec<BackupRecord>;

    /// If a recognized directory already accounts for everything below it.
    fn owns_subtree(&self) -> bool {
        false
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    PgProbackup(PgProbackup),
    PgBackRest(PgBackRest),
    PgBasebackup(PgBasebackup),
}

impl BackupAdapter for Adapter {
    fn name(&self) -> &'static str {
        match self {
            Self::PgProbackup(adapter) => adapter.name(),
            Self::PgBackRest(adapter) => adapter.name(),
            Self::PgBasebackup(adapter) => adapter.name(),
        }
    }

    fn tool(&self) -> BackupTool {
        match self {
            Self::PgProbackup(adapter) => adapter.tool(),
            Self::PgBackRest(adapter) => adapter.tool(),
            Self::PgBasebackup(adapter) => adapter.tool(),
        }
    }

    fn detect(&self, path: &Path) -> bool {
        match self {
            Self::PgProbackup(adapter) => adapter.detect(path),
            Self::PgBackRest(adapter) => adapter.detect(path),
            Self::PgBasebackup(adapter) => adapter.detect(path),
        }
    }

    fn scan(&self, path: &Path, options: &ScanOptions) -> Vec<BackupRecord> {
        match self {
            Self::PgProbackup(adapter) => adapter.scan(path, options),
            Self::PgBackRest(adapter) => adapter.scan(path, options),
            Self::PgBasebackup(adapter) => adapter.scan(path, options),
        }
    }

    fn owns_subtree(&self) -> bool {
        match self {
            Self::PgProbackup(adapter) => adapter.owns_subtree(),
            Self::PgBackRest(adapter) => adapter.owns_subtree(),
            Self::PgBasebackup(adapter) => adapter.owns_subtree(),
        }
    }
}

/// Follows symlinks, unlike the scanner's walk.
pub(crate) fn is_directory(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_dir())
}

pub(crate) fn is_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.is_file())
}

/// Parses `YYYY-MM-DD HH:MM:SS` with an optional trailing zone.
///
/// An offset such as `+03`, `+0530` or `-08:00`, or the names `UTC`, `GMT`
/// and `Z`, is honored. Anything else is read as local time. Fractional
/// seconds are ignored.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let naive = NaiveDateTime::parse_from_str(value.get(..19)?, "%Y-%m-%d %H:%M:%S").ok()?;

    let zone = value.get(19..)?;
    let zone = zone
        .strip_prefix('.')
        .map_or(zone, |fraction| fraction.trim_start_matches(|c: char| c.is_ascii_digit()))
        .trim();

    match parse_offset(zone) {
        Some(offset) => offset
            .from_local_datetime(&naive)
            .single()
            .map(|time| time.with_timezone(&Utc)),
        None => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|time| time.with_timezone(&Utc)),
    }
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    if ["UTC", "GMT", "Z"]
        .iter()
        .any(|name| zone.eq_ignore_ascii_case(name))
    {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match zone.chars().next()? {
        '+' => (1, zone.get(1..)?),
        '-' => (-1, zone.get(1..)?),
        _ => return None,
    };

    let digits: String = digits.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let (hours, minutes) = match digits.len() {
        2 => (digits.as_str(), "0"),
        4 => (digits.get(..2)?, digits.get(2..)?),
        _ => return None,
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Epoch seconds to a UTC time.
pub(crate) fn from_epoch(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}
