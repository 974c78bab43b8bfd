//! Backup path checks and start WAL presence.
//!

use std::{fs, path::Path};

use shared::WalSegmentName;
use tracing::warn;

use super::ValidationResult;
use crate::{context::Context, record::BackupRecord, wal_archive::WalArchive};

/// The backup path must exist and be a directory.
pub fn validate_structure(record: &BackupRecord) -> ValidationResult {
    let mut result = ValidationResult::default();

    match fs::metadata(&record.path) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => result.error(format!(
            "Backup path is not a directory: {}",
            record.path.display()
        )),
        Err(_) => result.error(format!(
            "Backup directory does not exist: {}",
            record.path.display()
        )),
    }

    result
}

/// The segment the backup starts in must be in its own `pg_wal/` or in the
/// archive.
pub fn check_start_wal_presence(
    record: &BackupRecord,
    wal: Option<&WalArchive>,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    let Some(start_file) = record.wal_start_file.as_deref() else {
        return result;
    };

    if in_backup_wal_directory(&record.path, start_file) {
        return result;
    }

    let archived = wal.is_some_and(|wal| {
        WalSegmentName::parse_file_name(start_file)
            .is_some_and(|segment| wal.contains(&segment))
    });

    if !archived {
        let context = Context::for_record(record, "WAL");
        warn!("{context}Start WAL segment {start_file} is not available");
        result.warning(format!("Start WAL segment not found: {start_file}"));
    }

    result
}

fn in_backup_wal_directory(path: &Path, segment: &str) -> bool {
    ["pg_wal", "pg_xlog"]
        .iter()
        .any(|directory| path.join(directory).join(segment).is_file())
}
