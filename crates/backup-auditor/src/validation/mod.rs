//! Leveled backup validation.
//!
//! Levels are cumulative: `basic` checks the backup directory, the backup
//! chain and the presence of the first WAL segment, `standard` adds metadata
//! consistency, `checksums` adds manifest-driven file verification and WAL
//! continuity, and `full` runs `pg_verifybackup`.
//!

use core::{fmt, str::FromStr};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    context::Context,
    record::BackupRecord,
    wal_archive::WalArchive,
};

mod chain;
mod checksums;
mod metadata;
mod retention;
mod structure;
mod verify;
mod wal;

pub use chain::validate_chain;
pub use checksums::{compute_checksum, validate_checksums};
pub use metadata::validate_backup_metadata;
pub use retention::{RetentionPolicy, check_retention_policy};
pub use structure::{check_start_wal_presence, validate_structure};
pub use verify::{VerifyError, VerifyOptions, run_pg_verifybackup, validate_full};
pub use wal::{MAX_RANGE_SEGMENTS, check_wal_availability};

/// How deep validation goes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Directory, chain and first WAL segment.
    Basic,
    /// Adds metadata consistency.
    #[default]
    Standard,
    /// Adds file checksums and WAL continuity.
    Checksums,
    /// Adds `pg_verifybackup`.
    Full,
}

impl ValidationLevel {
    #[allow(missing_docs)]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Checksums => "checksums",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "standard" => Ok(Self::Standard),
            "checksums" => Ok(Self::Checksums),
            "full" => Ok(Self::Full),
            _ => Err(format!(
                "Invalid validation level: {s} (valid levels: basic, standard, checksums, full)"
            )),
        }
    }
}

/// The overall outcome of a check.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationStatus {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        })
    }
}

/// Errors and warnings found by one or more checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    #[allow(missing_docs)]
    pub errors: Vec<String>,
    #[allow(missing_docs)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// ERROR if there are errors, WARNING if there are only warnings.
    pub fn status(&self) -> ValidationStatus {
        if !self.errors.is_empty() {
            ValidationStatus::Error
        } else if !self.warnings.is_empty() {
            ValidationStatus::Warning
        } else {
            ValidationStatus::Ok
        }
    }

    #[allow(missing_docs)]
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    #[allow(missing_docs)]
    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Appends the findings of `other`.
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    #[allow(missing_docs)]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    #[allow(missing_docs)]
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

/// The individual checks, in the order they run.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Structure,
    Chain,
    WalPresence,
    Metadata,
    Checksums,
    WalContinuity,
    Verify,
}

impl Check {
    /// A human readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::Structure => "Structure",
            Self::Chain => "Backup chain",
            Self::WalPresence => "WAL presence",
            Self::Metadata => "Metadata",
            Self::Checksums => "File checksums",
            Self::WalContinuity => "WAL continuity",
            Self::Verify => "pg_verifybackup",
        }
    }
}

/// The result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    #[allow(missing_docs)]
    pub check: Check,
    #[allow(missing_docs)]
    pub result: ValidationResult,
}

/// Settings for a validation run.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    #[allow(missing_docs)]
    pub level: ValidationLevel,

    /// Run the WAL presence and continuity checks.
    pub check_wal: bool,

    /// WAL segment size in bytes, zero for the default.
    pub wal_segment_size: u64,

    #[allow(missing_docs)]
    pub verify: VerifyOptions,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            level: ValidationLevel::default(),
            check_wal: true,
            wal_segment_size: shared::DEFAULT_WAL_SEGMENT_SIZE,
            verify: VerifyOptions::default(),
        }
    }
}

/// Runs every check up to `options.level` against `record`.
///
/// `inventory` is the full scan result, used to resolve parents. Callers
/// skip records whose status is ERROR or CORRUPT.
pub fn validate_backup(
    record: &BackupRecord,
    inventory: &[BackupRecord],
    wal: Option<&WalArchive>,
    options: &ValidationOptions,
) -> Vec<CheckOutcome> {
    let context = Context::for_record(record, "Validate");
    let mut outcomes = Vec::new();

    let mut push = |check: Check, result: ValidationResult| {
        debug!(
            "{context}{} finished with {} errors and {} warnings",
            check.label(),
            result.error_count(),
            result.warning_count()
        );
        outcomes.push(CheckOutcome { check, result });
    };

    push(Check::Structure, validate_structure(record));
    push(Check::Chain, validate_chain(record, inventory));

    if options.check_wal && record.wal_start_file.is_some() {
        push(Check::WalPresence, check_start_wal_presence(record, wal));
    }

    if options.level >= ValidationLevel::Standard {
        push(Check::Metadata, validate_backup_metadata(record));
    }

    if options.level >= ValidationLevel::Checksums {
        push(Check::Checksums, validate_checksums(record));

        if options.check_wal {
            match wal {
                Some(wal) => push(
                    Check::WalContinuity,
                    check_wal_availability(record, wal, options.wal_segment_size),
                ),
                None => debug!("{context}No WAL archive given, skipping WAL continuity"),
            }
        }
    }

    if options.level >= ValidationLevel::Full {
        if let Some(result) = validate_full(record, &options.verify) {
            push(Check::Verify, result);
        }
    }

    outcomes
}

/// Merges the results of every check.
pub fn merge_outcomes(outcomes: &[CheckOutcome]) -> ValidationResult {
    let mut merged = ValidationResult::default();
    for outcome in outcomes {
        merged.merge(outcome.result.clone());
    }
    merged
}

/// The verdict of a whole run.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Warning,
    Failed,
    NoValidationPerformed,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Failed => "FAILED",
            Self::NoValidationPerformed => "NO VALIDATION PERFORMED",
        })
    }
}

/// Totals for a validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    /// Backups selected for checking, including skipped ones.
    pub backups_found: usize,
    #[allow(missing_docs)]
    pub backups_validated: usize,
    /// Backups skipped for their ERROR or CORRUPT status.
    pub backups_skipped: usize,
    #[allow(missing_docs)]
    pub errors: usize,
    #[allow(missing_docs)]
    pub warnings: usize,
}

impl ValidationSummary {
    /// Counts one validated backup.
    pub fn add_validated(&mut self, result: &ValidationResult) {
        self.backups_found += 1;
        self.backups_validated += 1;
        self.errors += result.error_count();
        self.warnings += result.warning_count();
    }

    /// Counts one skipped backup.
    pub fn add_skipped(&mut self) {
        self.backups_found += 1;
        self.backups_skipped += 1;
    }

    /// Counts findings that do not belong to a single backup.
    pub fn add_findings(&mut self, result: &ValidationResult) {
        self.errors += result.error_count();
        self.warnings += result.warning_count();
    }

    #[allow(missing_docs)]
    pub fn verdict(&self) -> Verdict {
        if self.errors > 0 {
            Verdict::Failed
        } else if self.warnings > 0 {
            Verdict::Warning
        } else if self.backups_validated == 0 && self.backups_skipped > 0 {
            Verdict::NoValidationPerformed
        } else {
            Verdict::Ok
        }
    }
}
