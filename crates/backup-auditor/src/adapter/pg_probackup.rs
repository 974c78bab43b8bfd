//! pg_probackup catalogs and their `backup.control` files.
//!

use std::path::Path;

use chrono::{DateTime, Utc};
use shared::{KeyValueError, KeyValueFile, Lsn};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    context::Context,
    record::{BackupKind, BackupRecord, BackupStatus, BackupTool, directory_name, parse_server_version},
};

use super::{BackupAdapter, ScanOptions, is_directory, is_file, parse_timestamp};

/// The control file at the root of every pg_probackup backup.
pub const CONTROL_FILE: &str = "backup.control";

/// pg_probackup 2.5 block-level backups.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PgProbackup;

impl BackupAdapter for PgProbackup {
    fn name(&self) -> &'static str {
        "pg_probackup"
    }

    fn tool(&self) -> BackupTool {
        BackupTool::PgProbackup
    }

    fn detect(&self, path: &Path) -> bool {
        let detected = is_directory(path)
            && is_file(&path.join(CONTROL_FILE))
            && is_directory(&path.join("database"));

        if detected {
            debug!("Detected pg_probackup backup at {path:?}");
        }

        detected
    }

    fn scan(&self, path: &Path, _options: &ScanOptions) -> Vec<BackupRecord> {
        let context = Context {
            backup: Some((self.tool(), directory_name(path))),
            current_context: "Scan",
        };
        debug!("{context}Scanning pg_probackup backup at {path:?}");

        let mut record = match read_control_file(&context, path) {
            Ok(record) => record,
            Err(error) => {
                warn!("{context}Failed to read pg_probackup metadata: {error}");
                BackupRecord::failed(self.tool(), path)
            }
        };

        // Layout is `.../backups/<instance>/<backup id>`.
        record.instance = path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned());

        debug!(
            "{context}Found backup {} (instance={:?}, kind={}, status={})",
            record.backup_id, record.instance, record.kind, record.status
        );

        vec![record]
    }
}

fn read_control_file(context: &Context, path: &Path) -> Result<BackupRecord, ProbackupError> {
    let control = KeyValueFile::load(&path.join(CONTROL_FILE))?;
    let mut record = BackupRecord::new(BackupTool::PgProbackup, String::new(), path);

    let mut timeline_id = None;
    let mut timeline = None;

    for section in control.sections() {
        for (key, value) in section.iter() {
            if value.is_empty() {
                continue;
            }

            match key {
                "backup-mode" => match parse_kind(value) {
                    Some(kind) => record.kind = kind,
                    None => debug!("{context}Unknown backup-mode '{value}'"),
                },
                "status" => match parse_status(value) {
                    Some(status) => record.status = status,
                    None => debug!("{context}Unknown status '{value}'"),
                },
                "backup-id" => record.backup_id = value.to_string(),
                "start-lsn" => record.start_lsn = parse_lsn(context, key, value),
                "stop-lsn" => record.stop_lsn = parse_lsn(context, key, value),
                "start-time" => record.start_time = parse_time(context, key, value),
                "end-time" => record.end_time = parse_time(context, key, value),
                "timelineid" => timeline_id = value.parse().ok(),
                "timeline" => timeline = value.parse().ok(),
                "parent-backup-id" => record.parent_backup_id = Some(value.to_string()),
                "data-bytes" => record.data_bytes = value.parse().unwrap_or_default(),
                "wal-bytes" => record.wal_bytes = value.parse().unwrap_or_default(),
                "server-version" => record.pg_version = parse_server_version(value),
                "program-version" => record.tool_version = Some(value.to_string()),
                _ => {}
            }
        }
    }

    record.timeline = timeline_id.or(timeline).unwrap_or_default();

    if record.backup_id.is_empty() {
        record.backup_id = directory_name(path);
    }

    Ok(record)
}

fn parse_kind(value: &str) -> Option<BackupKind> {
    match value.to_ascii_uppercase().as_str() {
        "FULL" => Some(BackupKind::Full),
        "PAGE" => Some(BackupKind::Page),
        "DELTA" => Some(BackupKind::Delta),
        "PTRACK" => Some(BackupKind::Ptrack),
        _ => None,
    }
}

fn parse_status(value: &str) -> Option<BackupStatus> {
    match value.to_ascii_uppercase().as_str() {
        "OK" | "DONE" => Some(BackupStatus::Ok),
        "RUNNING" => Some(BackupStatus::Running),
        "CORRUPT" => Some(BackupStatus::Corrupt),
        "ERROR" => Some(BackupStatus::Error),
        "ORPHAN" => Some(BackupStatus::Orphan),
        _ => None,
    }
}

fn parse_lsn(context: &Context, key: &str, value: &str) -> Lsn {
    value.parse().unwrap_or_else(|error| {
        warn!("{context}Invalid {key} '{value}': {error}");
        Lsn::INVALID
    })
}

fn parse_time(context: &Context, key: &str, value: &str) -> Option<DateTime<Utc>> {
    let time = parse_timestamp(value);
    if time.is_none() {
        warn!("{context}Invalid {key} '{value}'");
    }
    time
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ProbackupError {
    #[error("Failed to read backup.control:\n{0}")]
    ReadControl(#[from] KeyValueError),
}
