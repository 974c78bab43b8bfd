//! Full verification through `pg_verifybackup`.
//!

use core::time::Duration;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
    thread,
    time::Instant,
};

use thiserror::Error;
use tracing::{debug, warn};

use super::ValidationResult;
use crate::{
    context::Context,
    record::{BackupRecord, BackupTool},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How `pg_verifybackup` is run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// The binary, looked up on `PATH` when not absolute.
    pub pg_verifybackup: PathBuf,
    #[allow(missing_docs)]
    pub timeout: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            pg_verifybackup: PathBuf::from("pg_verifybackup"),
            timeout: Duration::from_secs(300),
        }
    }
}

/// The `full` level check. Only pg_basebackup backups have one.
pub fn validate_full(record: &BackupRecord, options: &VerifyOptions) -> Option<ValidationResult> {
    if record.tool != BackupTool::PgBasebackup {
        return None;
    }

    let context = Context::for_record(record, "Verify");
    let mut result = ValidationResult::default();

    match run_pg_verifybackup(&record.path, options) {
        Ok(()) => debug!("{context}pg_verifybackup passed"),
        Err(VerifyError::NotFound(binary)) => {
            warn!("{context}pg_verifybackup is not available");
            result.warning(format!(
                "pg_verifybackup not found ({}), full verification skipped",
                binary.display()
            ));
        }
        Err(error) => {
            warn!("{context}{error}");
            result.error(error.to_string());
        }
    }

    Some(result)
}

/// Runs `pg_verifybackup --no-parse-wal --quiet <backup>`.
pub fn run_pg_verifybackup(backup: &Path, options: &VerifyOptions) -> Result<(), VerifyError> {
    let mut child = Command::new(&options.pg_verifybackup)
        .args(["--no-parse-wal", "--quiet"])
        .arg(backup)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| match error.kind() {
            io::ErrorKind::NotFound => VerifyError::NotFound(options.pg_verifybackup.clone()),
            _ => VerifyError::RunCommand(error),
        })?;

    // Drained on its own thread so a chatty verifier cannot fill the pipe.
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut output = String::new();
            stderr.read_to_string(&mut output).map(|_| output)
        })
    });

    let deadline = Instant::now().checked_add(options.timeout);
    let status: ExitStatus = loop {
        if let Some(status) = child.try_wait().map_err(VerifyError::RunCommand)? {
            break status;
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            if let Err(error) = child.kill() {
                warn!("Failed to kill pg_verifybackup: {error}");
            }
            // Reap the killed process.
            let _ = child.wait();
            return Err(VerifyError::Timeout(options.timeout));
        }

        thread::sleep(POLL_INTERVAL);
    };

    if status.success() {
        return Ok(());
    }

    let stderr = stderr_reader
        .and_then(|reader| reader.join().ok())
        .and_then(Result::ok)
        .unwrap_or_default();

    Err(VerifyError::CommandErrored(stderr.trim().to_string()))
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("pg_verifybackup not found: {0:?}")]
    NotFound(PathBuf),

    #[error("Failed to run pg_verifybackup:\n{0}")]
    RunCommand(#[source] io::Error),

    #[error("pg_verifybackup failed:\n{0}")]
    CommandErrored(String),

    #[error("pg_verifybackup did not finish within {0:?}")]
    Timeout(Duration),
}
