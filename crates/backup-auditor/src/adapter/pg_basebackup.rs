//! pg_basebackup output in plain and tar format.
//!

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    context::Context,
    manifest::{BackupManifest, ManifestError},
    record::{BackupKind, BackupRecord, BackupStatus, BackupTool, directory_name, parse_server_version},
};

use super::{BackupAdapter, ScanOptions, is_directory, is_file, parse_timestamp, read_member};

const LABEL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ID_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Streaming base backups, in plain or tar form.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PgBasebackup;

impl PgBasebackup {
    /// The first `base.tar*` file in `path`, by name.
    pub fn base_archive(path: &Path) -> Option<PathBuf> {
        first_file_with_prefix(path, "base.tar")
    }

    /// If `path` holds a `base.tar*` archive.
    pub fn is_tar_format(path: &Path) -> bool {
        Self::base_archive(path).is_some()
    }

    /// If `path` is a plain data directory copy with a label or manifest.
    pub fn is_plain_format(path: &Path) -> bool {
        is_directory(&path.join("base"))
            && is_directory(&path.join("global"))
            && (is_file(&path.join("backup_label")) || is_file(&path.join("backup_manifest")))
    }
}

impl BackupAdapter for PgBasebackup {
    fn name(&self) -> &'static str {
        "pg_basebackup"
    }

    fn tool(&self) -> BackupTool {
        BackupTool::PgBasebackup
    }

    fn detect(&self, path: &Path) -> bool {
        if !is_directory(path) {
            return false;
        }

        // The data directory inside a pg_probackup backup looks like a plain base backup.
        if let Some(parent) = path.parent() {
            if is_file(&parent.join("backup.control")) {
                debug!("Skipping {path:?}, parent has backup.control");
                return false;
            }
        }

        if Self::is_tar_format(path) {
            debug!("Detected pg_basebackup tar format at {path:?}");
            return true;
        }

        if Self::is_plain_format(path) {
            debug!("Detected pg_basebackup plain format at {path:?}");
            return true;
        }

        false
    }

    fn scan(&self, path: &Path, options: &ScanOptions) -> Vec<BackupRecord> {
        let context = Context {
            backup: Some((self.tool(), directory_name(path))),
            current_context: "Scan",
        };
        debug!("{context}Scanning pg_basebackup backup at {path:?}");

        let mut record = BackupRecord::new(self.tool(), directory_name(path), path);
        record.kind = BackupKind::Full;

        if let Err(error) = read_metadata(&context, path, options, &mut record) {
            warn!("{context}Failed to parse backup metadata: {error}");
            record.status = BackupStatus::Error;
        }

        record.data_bytes = directory_size(path);
        record.wal_bytes = wal_size(path);
        record.end_time = modified_time(path);

        if let Some(version) = read_pg_version(&context, path, options) {
            record.pg_version = version;
        }

        debug!(
            "{context}Scanned backup {} ({} bytes)",
            record.backup_id, record.data_bytes
        );

        vec![record]
    }
}

/// Label from the directory, then from the base archive, then the manifest.
fn read_metadata(
    context: &Context,
    path: &Path,
    options: &ScanOptions,
    record: &mut BackupRecord,
) -> Result<(), BasebackupError> {
    let label_path = path.join("backup_label");
    if is_file(&label_path) {
        let label = fs::read_to_string(&label_path).map_err(BasebackupError::ReadLabel)?;
        return parse_backup_label(&label, record);
    }

    if let Some(archive) = PgBasebackup::base_archive(path) {
        debug!("{context}Reading backup_label from {archive:?}");

        match read_member(&archive, "backup_label", options.archive_read_timeout) {
            Ok(Some(label)) => return parse_backup_label(&String::from_utf8_lossy(&label), record),
            Ok(None) => debug!("{context}{archive:?} has no backup_label"),
            Err(error) => warn!("{context}Could not read backup_label from {archive:?}: {error}"),
        }
    }

    debug!("{context}backup_label not found, trying backup_manifest");
    read_manifest_fallback(&path.join("backup_manifest"), record)
}

/// Applies the fields of a `backup_label` to `record`.
pub fn parse_backup_label(label: &str, record: &mut BackupRecord) -> Result<(), BasebackupError> {
    let mut found_start_time = false;

    for line in label.lines() {
        if let Some(value) = field(line, "START WAL LOCATION:") {
            if let Some(lsn) = value.split_whitespace().next().and_then(|lsn| lsn.parse().ok()) {
                record.start_lsn = lsn;
            }

            if let Some((_, file)) = value.split_once("(file ") {
                if let Some((file, _)) = file.split_once(')') {
                    record.wal_start_file = Some(file.trim().to_string());
                }
            }
        } else if let Some(value) = field(line, "CHECKPOINT LOCATION:") {
            if let Some(lsn) = value.split_whitespace().next().and_then(|lsn| lsn.parse().ok()) {
                record.stop_lsn = lsn;
            }
        } else if let Some(value) = field(line, "BACKUP METHOD:") {
            record.backup_method = Some(value.to_string());
        } else if let Some(value) = field(line, "BACKUP FROM:") {
            record.backup_from = Some(value.to_string());
        } else if let Some(value) = field(line, "LABEL:") {
            record.label = Some(value.to_string());
        } else if let Some(value) = field(line, "START TIME:") {
            let Some(naive) = value
                .get(..19)
                .and_then(|time| NaiveDateTime::parse_from_str(time, LABEL_TIME_FORMAT).ok())
            else {
                continue;
            };

            record.backup_id = naive.format(ID_TIME_FORMAT).to_string();
            record.start_time = parse_timestamp(value);
            found_start_time = true;
        } else if let Some(value) = field(line, "START TIMELINE:") {
            record.timeline = value.trim().parse().unwrap_or_default();
        } else if field(line, "INCREMENTAL FROM LSN:").is_some() {
            record.kind = BackupKind::Incremental;
        }
    }

    if !found_start_time {
        return Err(BasebackupError::MissingStartTime);
    }

    Ok(())
}

/// Backups combined with pg_combinebackup keep only the manifest.
fn read_manifest_fallback(path: &Path, record: &mut BackupRecord) -> Result<(), BasebackupError> {
    let manifest = BackupManifest::load(path)?;
    let range = manifest.wal_ranges.first().ok_or(BasebackupError::NoWalRange)?;

    record.timeline = range.timeline;
    if let Ok(lsn) = range.start_lsn.parse() {
        record.start_lsn = lsn;
    }
    if let Some(lsn) = range.end_lsn.as_deref().and_then(|lsn| lsn.parse().ok()) {
        record.stop_lsn = lsn;
    }

    let now = Local::now();
    record.backup_id = now.format(ID_TIME_FORMAT).to_string();
    record.start_time = Some(now.with_timezone(&Utc));

    Ok(())
}

fn field<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.strip_prefix(prefix)
        .map(|value| value.trim_start_matches([' ', '\t']).trim_end_matches(['\r', '\n']))
}

fn read_pg_version(context: &Context, path: &Path, options: &ScanOptions) -> Option<u32> {
    let version = match fs::read_to_string(path.join("PG_VERSION")) {
        Ok(version) => version,
        Err(_) => {
            let archive = PgBasebackup::base_archive(path)?;
            match read_member(&archive, "PG_VERSION", options.archive_read_timeout) {
                Ok(Some(version)) => String::from_utf8_lossy(&version).into_owned(),
                Ok(None) => return None,
                Err(error) => {
                    debug!("{context}Could not read PG_VERSION from {archive:?}: {error}");
                    return None;
                }
            }
        }
    };

    let version = parse_server_version(version.lines().next().unwrap_or_default());
    (version != 0).then_some(version)
}

fn wal_size(path: &Path) -> u64 {
    let wal_directory = path.join("pg_wal");
    if is_directory(&wal_directory) {
        return directory_size(&wal_directory);
    }

    first_file_with_prefix(path, "pg_wal.tar")
        .and_then(|archive| fs::metadata(archive).ok())
        .map_or(0, |metadata| metadata.len())
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(path).and_then(|metadata| metadata.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

fn first_file_with_prefix(path: &Path, prefix: &str) -> Option<PathBuf> {
    let mut names: Vec<String> = fs::read_dir(path)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|file_type| file_type.is_file()))
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(prefix))
        .collect();

    names.sort();
    names.first().map(|name| path.join(name))
}

/// Total size of the regular files under `path`. Symlinks are not followed.
pub fn directory_size(path: &Path) -> u64 {
    let mut total = 0u64;
    let mut stack = vec![path.to_path_buf()];

    while let Some(directory) = stack.pop() {
        let Ok(entries) = fs::read_dir(&directory) else {
            continue;
        };

        for entry in entries.filter_map(Result::ok) {
            let Ok(metadata) = fs::symlink_metadata(entry.path()) else {
                continue;
            };

            if metadata.is_dir() {
                stack.push(entry.path());
            } else if metadata.is_file() {
                total = total.saturating_add(metadata.len());
            }
        }
    }

    total
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum BasebackupError {
    #[error("Failed to read backup_label:\n{0}")]
    ReadLabel(#[source] io::Error),

    #[error("START TIME not found in backup_label")]
    MissingStartTime,

    #[error("Neither backup_label nor a valid backup_manifest found:\n{0}")]
    Manifest(#[from] ManifestError),

    #[error("backup_manifest has no WAL range")]
    NoWalRange,
}
