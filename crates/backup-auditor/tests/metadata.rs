//! Tests for metadata validation
//!

use std::path::PathBuf;

use backup_auditor::{
    BackupStatus,
    validation::{ValidationStatus, validate_backup_metadata},
};
use common::record;
use shared::Lsn;

mod common;

#[test]
fn complete_record_is_clean() {
    let result = validate_backup_metadata(&record("b1", &PathBuf::from("/backups/b1")));

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn reversed_lsn_range() {
    let mut backup = record("b1", &PathBuf::from("/backups/b1"));
    backup.start_lsn = Lsn(0x0300_0000);
    backup.stop_lsn = Lsn(0x0200_0000);

    let result = validate_backup_metadata(&backup);

    assert_eq!(
        result.errors,
        vec!["Invalid LSN range: start_lsn (0/3000000) >= stop_lsn (0/2000000)"]
    );
    assert!(result.warnings.is_empty());
}

#[test]
fn unknown_lsn_is_not_a_range_error() {
    let mut backup = record("b1", &PathBuf::from("/backups/b1"));
    backup.stop_lsn = Lsn::INVALID;

    assert_eq!(
        validate_backup_metadata(&backup).status(),
        ValidationStatus::Ok
    );
}

#[test]
fn reversed_timestamps() {
    let mut backup = record("b1", &PathBuf::from("/backups/b1"));
    backup.end_time = backup.start_time;

    let result = validate_backup_metadata(&backup);

    assert_eq!(
        result.errors,
        vec!["Invalid timestamps: start_time (1704709530) >= end_time (1704709530)"]
    );
}

#[test]
fn missing_fields_warn() {
    let mut backup = record("b1", &PathBuf::from("/backups/b1"));
    backup.start_time = None;
    backup.end_time = None;
    backup.timeline = 0;
    backup.pg_version = 0;

    let result = validate_backup_metadata(&backup);

    assert!(result.errors.is_empty());
    assert_eq!(
        result.warnings,
        vec![
            "Missing start_time",
            "Missing end_time for completed backup",
            "Missing timeline ID",
            "Missing PostgreSQL version",
        ]
    );
}

#[test]
fn running_backup_may_lack_end_time() {
    let mut backup = record("b1", &PathBuf::from("/backups/b1"));
    backup.status = BackupStatus::Running;
    backup.end_time = None;

    assert_eq!(
        validate_backup_metadata(&backup).status(),
        ValidationStatus::Ok
    );
}

#[test]
fn missing_identity_is_an_error() {
    let backup = record("", &PathBuf::new());

    let result = validate_backup_metadata(&backup);

    assert_eq!(result.errors, vec!["Missing backup_id", "Missing backup_path"]);
}
