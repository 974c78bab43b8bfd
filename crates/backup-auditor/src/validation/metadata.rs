//! Required fields and their ordering.
//!

use super::ValidationResult;
use crate::record::{BackupRecord, BackupStatus};

/// Checks that the record's metadata is present and self-consistent.
pub fn validate_backup_metadata(record: &BackupRecord) -> ValidationResult {
    let mut result = ValidationResult::default();

    if record.backup_id.is_empty() {
        result.error("Missing backup_id");
    }

    if record.path.as_os_str().is_empty() {
        result.error("Missing backup_path");
    }

    if record.start_time.is_none() {
        result.warning("Missing start_time");
    }

    if record.end_time.is_none() && record.status == BackupStatus::Ok {
        result.warning("Missing end_time for completed backup");
    }

    if let (Some(start), Some(end)) = (record.start_time, record.end_time) {
        if start >= end {
            result.error(format!(
                "Invalid timestamps: start_time ({}) >= end_time ({})",
                start.timestamp(),
                end.timestamp()
            ));
        }
    }

    if record.start_lsn.is_valid()
        && record.stop_lsn.is_valid()
        && record.start_lsn >= record.stop_lsn
    {
        result.error(format!(
            "Invalid LSN range: start_lsn ({}) >= stop_lsn ({})",
            record.start_lsn, record.stop_lsn
        ));
    }

    if record.timeline == 0 {
        result.warning("Missing timeline ID");
    }

    if record.pg_version == 0 {
        result.warning("Missing PostgreSQL version");
    }

    result
}
