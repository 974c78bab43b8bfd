//! Tests for the retention policy check
//!

use std::path::PathBuf;

use backup_auditor::{
    BackupRecord, BackupStatus,
    validation::{RetentionPolicy, ValidationStatus, check_retention_policy},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use common::record;

mod common;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn backup_days_ago(days: i64) -> BackupRecord {
    let mut backup = record(&format!("b{days}"), &PathBuf::from("/backups"));
    backup.start_time = Some(now() - Duration::days(days));
    backup.end_time = None;
    backup
}

#[test]
fn weekly_backups_satisfy_policy() {
    let records: Vec<_> = [1, 8, 15, 22].into_iter().map(backup_days_ago).collect();

    let result = check_retention_policy(&records, now(), &RetentionPolicy::default());

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn missing_week_warns() {
    let records: Vec<_> = [1, 8, 15].into_iter().map(backup_days_ago).collect();

    let result = check_retention_policy(&records, now(), &RetentionPolicy::default());

    assert!(result.errors.is_empty());
    assert_eq!(
        result.warnings,
        vec!["Only 3 of the last 4 week(s) have a successful backup"]
    );
}

#[test]
fn stale_inventory_errors() {
    let records = vec![backup_days_ago(10)];
    let policy = RetentionPolicy { days: 7, weekly: 0 };

    let result = check_retention_policy(&records, now(), &policy);

    assert_eq!(
        result.errors,
        vec!["No successful backup in the last 7 day(s)"]
    );
}

#[test]
fn failed_backups_do_not_count() {
    let mut failed = backup_days_ago(1);
    failed.status = BackupStatus::Error;
    let policy = RetentionPolicy { days: 7, weekly: 0 };

    let result = check_retention_policy(&[failed], now(), &policy);

    assert_eq!(result.error_count(), 1);
}

#[test]
fn end_time_stands_in_for_start() {
    let mut backup = backup_days_ago(1);
    backup.end_time = backup.start_time;
    backup.start_time = None;
    let policy = RetentionPolicy { days: 2, weekly: 1 };

    let result = check_retention_policy(&[backup], now(), &policy);

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn zero_disables_checks() {
    let policy = RetentionPolicy { days: 0, weekly: 0 };

    let result = check_retention_policy(&[], now(), &policy);

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn huge_day_window_reaches_start_of_time() {
    let records = vec![backup_days_ago(3650)];
    let policy = RetentionPolicy {
        days: u32::MAX,
        weekly: 0,
    };

    let result = check_retention_policy(&records, Utc::now(), &policy);

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[test]
fn huge_weekly_count_stops_at_oldest_backup() {
    let records: Vec<_> = [1, 8].into_iter().map(backup_days_ago).collect();
    let policy = RetentionPolicy {
        days: 0,
        weekly: u32::MAX,
    };

    let result = check_retention_policy(&records, now(), &policy);

    assert!(result.errors.is_empty());
    assert_eq!(
        result.warnings,
        vec![format!(
            "Only 2 of the last {} week(s) have a successful backup",
            u32::MAX
        )]
    );
}
