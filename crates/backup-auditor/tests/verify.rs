//! Tests for the external pg_verifybackup run
//!

use core::time::Duration;
use std::path::{Path, PathBuf};

use backup_auditor::{
    BackupTool,
    validation::{
        ValidationStatus, VerifyError, VerifyOptions, run_pg_verifybackup, validate_full,
    },
};
use common::{LABEL, basebackup_plain, record};
use tempfile::TempDir;

mod common;

/// An executable shell script at `directory/name`.
#[cfg(unix)]
fn script(directory: &Path, name: &str, body: &str) -> PathBuf {
    use std::{fs, os::unix::fs::PermissionsExt};

    let path = directory.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn options(binary: PathBuf, timeout: Duration) -> VerifyOptions {
    VerifyOptions {
        pg_verifybackup: binary,
        timeout,
    }
}

#[test]
fn missing_binary_warns() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let options = options(root.path().join("no-such-verifier"), Duration::from_secs(5));

    let result = validate_full(&record("base", &path), &options).unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.warning_count(), 1);
    assert!(
        result
            .warnings
            .first()
            .unwrap()
            .starts_with("pg_verifybackup not found")
    );
}

#[test]
fn other_tools_have_no_full_check() {
    let root = TempDir::new().unwrap();
    let mut backup = record("S6OBFN", root.path());
    backup.tool = BackupTool::PgProbackup;

    assert!(validate_full(&backup, &VerifyOptions::default()).is_none());

    backup.tool = BackupTool::PgBackRest;
    assert!(validate_full(&backup, &VerifyOptions::default()).is_none());
}

#[cfg(unix)]
#[test]
fn passing_verifier() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let verifier = script(root.path(), "verify-ok", "exit 0");

    let result = validate_full(
        &record("base", &path),
        &options(verifier, Duration::from_secs(30)),
    )
    .unwrap();

    assert_eq!(result.status(), ValidationStatus::Ok);
}

#[cfg(unix)]
#[test]
fn failing_verifier_reports_stderr() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let verifier = script(
        root.path(),
        "verify-fail",
        "echo \"checksum mismatch for file base/1/1259\" >&2\nexit 1",
    );

    let result = validate_full(
        &record("base", &path),
        &options(verifier, Duration::from_secs(30)),
    )
    .unwrap();

    assert_eq!(result.error_count(), 1);
    assert!(
        result
            .errors
            .first()
            .unwrap()
            .contains("checksum mismatch for file base/1/1259")
    );
}

#[cfg(unix)]
#[test]
fn slow_verifier_times_out() {
    let root = TempDir::new().unwrap();
    let path = basebackup_plain(root.path(), "base", LABEL);
    let verifier = script(root.path(), "verify-slow", "exec sleep 30");
    let options = options(verifier, Duration::from_secs(1));

    let error = run_pg_verifybackup(&path, &options).unwrap_err();
    assert!(matches!(error, VerifyError::Timeout(timeout) if timeout == Duration::from_secs(1)));

    let result = validate_full(&record("base", &path), &options).unwrap();
    assert_eq!(
        result.errors,
        vec!["pg_verifybackup did not finish within 1s"]
    );
}
