//! Tests for WAL presence and continuity
//!

use std::path::PathBuf;

use backup_auditor::{
    BackupRecord, WalArchive,
    scanner::scan_wal_archive,
    validation::{
        Check, MAX_RANGE_SEGMENTS, ValidationLevel, ValidationOptions, ValidationStatus,
        check_start_wal_presence, check_wal_availability, validate_backup,
    },
};
use common::{LABEL, basebackup_plain, record, wal_archive, write};
use shared::{DEFAULT_WAL_SEGMENT_SIZE, Lsn, WalSegmentName};
use tempfile::TempDir;

mod common;

fn archive(seg_ids: impl IntoIterator<Item = u32>) -> WalArchive {
    let segments = seg_ids
        .into_iter()
        .map(|seg_id| WalSegmentName::new(1, 0, seg_id))
        .collect();
    WalArchive::new(PathBuf::from("/wal"), segments)
}

fn spanning_record() -> BackupRecord {
    let mut backup = record("20240108-100530", &PathBuf::from("/backups/base"));
    backup.start_lsn = Lsn(0x100);
    backup.stop_lsn = Lsn(0x0400_0100);
    backup
}

#[test]
fn complete_range_passes() {
    let result = check_wal_availability(&spanning_record(), &archive(0..10), 0);

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn each_missing_segment_is_an_error() {
    let result = check_wal_availability(
        &spanning_record(),
        &archive([0, 1, 3, 4, 5]),
        DEFAULT_WAL_SEGMENT_SIZE,
    );

    assert_eq!(
        result.errors,
        vec!["Missing WAL segment: 000000010000000000000002"]
    );
    assert_eq!(result.status(), ValidationStatus::Error);
}

#[test]
fn non_adjacent_missing_segments() {
    let result = check_wal_availability(
        &spanning_record(),
        &archive([0, 2, 4, 5, 6, 7, 8, 9]),
        DEFAULT_WAL_SEGMENT_SIZE,
    );

    assert_eq!(result.errors.len(), 2);
    assert_eq!(
        result.errors,
        vec![
            "Missing WAL segment: 000000010000000000000001",
            "Missing WAL segment: 000000010000000000000003",
        ]
    );
    assert_eq!(result.status(), ValidationStatus::Error);
}

#[test]
fn missing_segment_across_log_boundary() {
    let mut backup = spanning_record();
    backup.start_lsn = Lsn(0xFFFF_FFFF * DEFAULT_WAL_SEGMENT_SIZE);
    backup.stop_lsn = Lsn(0x1_0000_0001 * DEFAULT_WAL_SEGMENT_SIZE);
    let wal = WalArchive::new(
        PathBuf::from("/wal"),
        vec![
            WalSegmentName::new(1, 0, 0xFFFF_FFFF),
            WalSegmentName::new(1, 1, 1),
        ],
    );

    let result = check_wal_availability(&backup, &wal, DEFAULT_WAL_SEGMENT_SIZE);

    assert_eq!(result.errors.len(), 1);
    assert_eq!(
        result.errors,
        vec!["Missing WAL segment: 000000010000000100000000"]
    );
    assert_eq!(result.status(), ValidationStatus::Error);
}

#[test]
fn corrupt_stop_lsn_is_not_enumerated() {
    let mut backup = spanning_record();
    backup.stop_lsn = Lsn(0xFFFF_0000_0000);

    let result = check_wal_availability(&backup, &archive(0..10), DEFAULT_WAL_SEGMENT_SIZE);

    assert_eq!(
        result.errors,
        vec!["WAL range check aborted: too many segments"]
    );
}

#[test]
fn longest_allowed_range_is_enumerated() {
    let mut backup = spanning_record();
    backup.start_lsn = Lsn(0);
    backup.stop_lsn = Lsn((MAX_RANGE_SEGMENTS - 1) * DEFAULT_WAL_SEGMENT_SIZE);
    let wal = WalArchive::new(
        PathBuf::from("/wal"),
        (0..MAX_RANGE_SEGMENTS)
            .map(|number| WalSegmentName::from_segment_number(1, number))
            .collect(),
    );

    let result = check_wal_availability(&backup, &wal, DEFAULT_WAL_SEGMENT_SIZE);

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn missing_lsns_warn_once() {
    let mut backup = spanning_record();
    backup.start_lsn = Lsn::INVALID;
    backup.stop_lsn = Lsn::INVALID;

    let result = check_wal_availability(&backup, &archive(0..10), 0);

    assert!(result.errors.is_empty());
    assert_eq!(result.warnings, vec!["Backup has no LSN information"]);
}

#[test]
fn only_known_lsn_is_checked() {
    let mut backup = spanning_record();
    backup.stop_lsn = Lsn::INVALID;

    let result = check_wal_availability(&backup, &archive([0]), 0);

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn unknown_timeline_is_one() {
    let mut backup = spanning_record();
    backup.timeline = 0;

    let result = check_wal_availability(&backup, &archive([0, 1, 2, 3]), 0);

    assert_eq!(
        result.errors,
        vec!["Missing WAL segment: 000000010000000000000004"]
    );
}

#[test]
fn start_segment_in_backup_wal_directory() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let mut backup = record("base", &path);
    backup.wal_start_file = Some("000000010000000000000002".to_string());

    let missing = check_start_wal_presence(&backup, None);
    assert_eq!(
        missing.warnings,
        vec!["Start WAL segment not found: 000000010000000000000002"]
    );

    write(&path.join("pg_wal/000000010000000000000002"), "");
    assert_eq!(
        check_start_wal_presence(&backup, None).status(),
        ValidationStatus::Ok
    );
}

#[test]
fn start_segment_in_archive() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let mut backup = record("base", &path);
    backup.wal_start_file = Some("000000010000000000000002".to_string());

    let result = check_start_wal_presence(&backup, Some(&archive([2])));

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn continuity_runs_from_checksums_level() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let wal_dir = root.path().join("wal");
    wal_archive(&wal_dir, 1, 0..10);
    let wal = scan_wal_archive(&wal_dir).unwrap();

    let backup = record("base", &path);
    let inventory = vec![backup.clone()];

    let checks = |level| {
        let options = ValidationOptions {
            level,
            ..ValidationOptions::default()
        };
        validate_backup(&backup, &inventory, Some(&wal), &options)
            .into_iter()
            .map(|outcome| outcome.check)
            .collect::<Vec<_>>()
    };

    assert!(!checks(ValidationLevel::Standard).contains(&Check::WalContinuity));
    assert!(checks(ValidationLevel::Checksums).contains(&Check::WalContinuity));
}

#[test]
fn skip_wal_disables_wal_checks() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let mut backup = record("base", &path);
    backup.wal_start_file = Some("000000010000000000000002".to_string());
    let inventory = vec![backup.clone()];

    let options = ValidationOptions {
        level: ValidationLevel::Checksums,
        check_wal: false,
        ..ValidationOptions::default()
    };
    let checks: Vec<_> = validate_backup(&backup, &inventory, Some(&archive([])), &options)
        .into_iter()
        .map(|outcome| outcome.check)
        .collect();

    assert_eq!(
        checks,
        vec![Check::Structure, Check::Chain, Check::Metadata, Check::Checksums]
    );
}
