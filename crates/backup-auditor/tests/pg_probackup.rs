//! Tests for the pg_probackup adapter
//!

use std::fs;

use backup_auditor::{
    BackupKind, BackupStatus, BackupTool,
    adapter::{BackupAdapter, PgProbackup, ScanOptions},
};
use chrono::{TimeZone, Utc};
use common::{probackup_backup, probackup_control};
use shared::Lsn;
use tempfile::TempDir;

mod common;

#[test]
fn detect_requires_control_file_and_database() {
    let root = TempDir::new().unwrap();
    let path = probackup_backup(
        root.path(),
        "main",
        "S6OBFN",
        &probackup_control("FULL", "OK", None),
    );

    assert!(PgProbackup.detect(&path));
    assert!(!PgProbackup.detect(&path.join("database")));

    fs::remove_dir_all(path.join("database")).unwrap();
    assert!(!PgProbackup.detect(&path));
}

#[test]
fn scan_reads_control_file() {
    let root = TempDir::new().unwrap();
    let path = probackup_backup(
        root.path(),
        "main",
        "S6OBFN",
        &probackup_control("FULL", "OK", None),
    );

    let records = PgProbackup.scan(&path, &ScanOptions::default());
    assert_eq!(records.len(), 1);
    let record = records.first().unwrap();

    assert_eq!(record.tool, BackupTool::PgProbackup);
    assert_eq!(record.backup_id, "S6OBFN");
    assert_eq!(record.instance.as_deref(), Some("main"));
    assert_eq!(record.kind, BackupKind::Full);
    assert_eq!(record.status, BackupStatus::Ok);
    assert_eq!(record.timeline, 1);
    assert_eq!(record.start_lsn, Lsn(0x0200_0028));
    assert_eq!(record.stop_lsn, Lsn(0x0200_0138));
    assert_eq!(
        record.start_time,
        Utc.with_ymd_and_hms(2024, 1, 8, 10, 5, 30).single()
    );
    assert_eq!(
        record.end_time,
        Utc.with_ymd_and_hms(2024, 1, 8, 10, 7, 30).single()
    );
    assert_eq!(record.data_bytes, 22_288_792);
    assert_eq!(record.wal_bytes, 16_777_216);
    assert_eq!(record.pg_version, 160_000);
    assert_eq!(record.tool_version.as_deref(), Some("2.5.12"));
    assert_eq!(record.parent_backup_id, None);
}

#[test]
fn scan_incremental_with_parent() {
    let root = TempDir::new().unwrap();
    let path = probackup_backup(
        root.path(),
        "main",
        "S6OC2P",
        &probackup_control("PAGE", "DONE", Some("S6OBFN")),
    );

    let record = PgProbackup.scan(&path, &ScanOptions::default()).remove(0);

    assert_eq!(record.kind, BackupKind::Page);
    assert_eq!(record.status, BackupStatus::Ok);
    assert_eq!(record.parent_backup_id.as_deref(), Some("S6OBFN"));
}

#[test]
fn scan_prefers_timelineid_and_explicit_id() {
    let root = TempDir::new().unwrap();
    let control = "backup-id = RENAMED\ntimeline = 7\ntimelineid = 3\nstatus = CORRUPT\n";
    let path = probackup_backup(root.path(), "main", "S6OBFN", control);

    let record = PgProbackup.scan(&path, &ScanOptions::default()).remove(0);

    assert_eq!(record.backup_id, "RENAMED");
    assert_eq!(record.timeline, 3);
    assert_eq!(record.status, BackupStatus::Corrupt);
}

#[test]
fn scan_invalid_lsn_leaves_it_unknown() {
    let root = TempDir::new().unwrap();
    let control = "start-lsn = nonsense\nstop-lsn = 0/3000000\nstatus = OK\n";
    let path = probackup_backup(root.path(), "main", "S6OBFN", control);

    let record = PgProbackup.scan(&path, &ScanOptions::default()).remove(0);

    assert_eq!(record.start_lsn, Lsn::INVALID);
    assert_eq!(record.stop_lsn, Lsn(0x0300_0000));
    assert_eq!(record.status, BackupStatus::Ok);
}
