use std::{io::Write, path::PathBuf};

use chrono::Utc;
use clap::Args;
use tracing::{info, warn};

use super::{CommandError, ExitCode, list::resolve_max_depth};
use crate::{
    config::Config,
    output::Style,
    record::BackupRecord,
    registry::Registry,
    scanner::{scan_backup_directory, scan_wal_archive},
    validation::{
        CheckOutcome, ValidationLevel, ValidationOptions, ValidationResult, ValidationSummary,
        Verdict, check_retention_policy, merge_outcomes, validate_backup,
    },
    wal_archive::WalArchive,
};

const BANNER: &str = "====================================================";
const RULE: &str = "----------------------------------------------------";

#[allow(missing_docs)]
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Directory to search for backups.
    #[arg(short = 'B', long)]
    pub backup_dir: PathBuf,

    /// Only check the backup with this identifier.
    #[arg(short = 'i', long)]
    pub backup_id: Option<String>,

    /// WAL archive directory.
    #[arg(short = 'w', long)]
    pub wal_archive: Option<PathBuf>,

    /// Validation level, the config value when absent.
    #[arg(short = 'l', long, value_enum)]
    pub level: Option<ValidationLevel>,

    /// Skip the WAL checks.
    #[arg(long)]
    pub skip_wal: bool,

    /// Also check the retention policy.
    #[arg(long)]
    pub retention: bool,

    /// How deep to search, -1 for unlimited.
    #[arg(short = 'd', long, allow_negative_numbers = true)]
    pub max_depth: Option<i64>,
}

/// The `check` command.
pub fn check(
    args: &CheckArgs,
    config: &Config,
    style: Style,
    out: &mut dyn Write,
) -> Result<ExitCode, CommandError> {
    let max_depth = resolve_max_depth(args.max_depth, config)?;
    let level = args.level.unwrap_or(config.validation.level);

    info!("Scanning backup directory: {:?}", args.backup_dir);
    let records = scan_backup_directory(
        &args.backup_dir,
        max_depth,
        &Registry::default(),
        &config.scan_options(),
    )?;

    if records.is_empty() {
        return Err(CommandError::NoBackupsFound(args.backup_dir.clone()));
    }

    let wal = args
        .wal_archive
        .as_deref()
        .map(scan_wal_archive)
        .transpose()?;

    let selected: Vec<&BackupRecord> = records
        .iter()
        .filter(|record| {
            args.backup_id
                .as_ref()
                .is_none_or(|backup_id| record.backup_id == *backup_id)
        })
        .collect();

    if let (Some(backup_id), true) = (&args.backup_id, selected.is_empty()) {
        return Err(CommandError::BackupNotFound(backup_id.clone()));
    }

    let options = ValidationOptions {
        level,
        check_wal: !args.skip_wal,
        wal_segment_size: config.scan.wal_segment_size,
        verify: config.verify_options(),
    };

    writeln!(out, "{BANNER}")?;
    writeln!(out, "Backup Validation")?;
    writeln!(out, "{BANNER}")?;
    writeln!(out, "Directory:        {}", args.backup_dir.display())?;
    writeln!(out, "Validation level: {level}")?;
    writeln!(out, "{BANNER}")?;

    let mut summary = ValidationSummary::default();

    for (index, record) in selected.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }

        writeln!(
            out,
            "{} {} ({})",
            style.bold("Backup:"),
            record.backup_id,
            record.tool
        )?;

        if record.status.skips_validation() {
            writeln!(
                out,
                "  {} Status: {} - validation not performed",
                style.note("[SKIPPED]"),
                record.status
            )?;
            summary.add_skipped();
            continue;
        }

        let outcomes = validate_backup(record, &records, wal.as_ref(), &options);
        for outcome in &outcomes {
            write_outcome(outcome, style, out)?;
        }
        summary.add_validated(&merge_outcomes(&outcomes));
    }

    if let Some(wal) = &wal {
        if !args.skip_wal {
            let findings = write_archive_section(wal, style, out)?;
            summary.add_findings(&findings);
        }
    }

    if args.retention || config.retention.enabled {
        let findings = check_retention_policy(&records, Utc::now(), &config.retention_policy());
        writeln!(out)?;
        writeln!(out, "{}", style.bold("Retention policy:"))?;
        write_findings("Retention policy", &findings, style, out)?;
        summary.add_findings(&findings);
    }

    write_summary(&summary, style, out)
}

fn write_outcome(
    outcome: &CheckOutcome,
    style: Style,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    write_findings(outcome.check.label(), &outcome.result, style, out)
}

fn write_findings(
    label: &str,
    result: &ValidationResult,
    style: Style,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    if !result.errors.is_empty() {
        writeln!(out, "  {} {label} validation failed:", style.error("[ERROR]"))?;
        for error in &result.errors {
            writeln!(out, "          {error}")?;
        }
    }

    if !result.warnings.is_empty() {
        writeln!(out, "  {} {label} issues:", style.warning("[WARNING]"))?;
        for warning in &result.warnings {
            writeln!(out, "            {warning}")?;
        }
    }

    if result.errors.is_empty() && result.warnings.is_empty() {
        writeln!(out, "  {} {label} validation passed", style.ok("[OK]"))?;
    }

    Ok(())
}

fn write_archive_section(
    wal: &WalArchive,
    style: Style,
    out: &mut dyn Write,
) -> Result<ValidationResult, CommandError> {
    let mut findings = ValidationResult::default();
    for gap in wal.gaps() {
        warn!("WAL archive gap: {gap}");
        findings.warning(format!(
            "WAL gap: {gap} ({} segment(s) missing)",
            gap.segment_count()
        ));
    }

    writeln!(out)?;
    writeln!(out, "{} {}", style.bold("WAL archive:"), wal.path().display())?;
    writeln!(out, "  Segments:         {}", wal.len())?;
    write_findings("WAL archive", &findings, style, out)?;

    Ok(findings)
}

fn plural_was(count: usize) -> &'static str {
    if count == 1 { " was" } else { "s were" }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn write_summary(
    summary: &ValidationSummary,
    style: Style,
    out: &mut dyn Write,
) -> Result<ExitCode, CommandError> {
    writeln!(out)?;
    writeln!(out, "{BANNER}")?;
    writeln!(out, "Validation Summary")?;
    writeln!(out, "{BANNER}")?;
    writeln!(out, "  Total backups found:    {}", summary.backups_found)?;
    writeln!(out, "  Backups validated:      {}", summary.backups_validated)?;
    if summary.backups_skipped > 0 {
        writeln!(
            out,
            "  Backups skipped:        {} (ERROR/CORRUPT status)",
            summary.backups_skipped
        )?;
    }
    writeln!(out, "{RULE}")?;
    writeln!(out, "  Validation errors:      {}", summary.errors)?;
    writeln!(out, "  Validation warnings:    {}", summary.warnings)?;
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;

    let skipped = summary.backups_skipped;
    let verdict = summary.verdict();
    let result_line = format!("Result: {verdict}");

    match verdict {
        Verdict::Failed => {
            writeln!(out, "{}", style.error(result_line))?;
            writeln!(
                out,
                "  {} validation error{} found in checked backups.",
                summary.errors,
                plural(summary.errors)
            )?;
        }
        Verdict::Warning => {
            writeln!(out, "{}", style.warning(result_line))?;
            writeln!(
                out,
                "  {} validation warning{} found in checked backups.",
                summary.warnings,
                plural(summary.warnings)
            )?;
        }
        Verdict::NoValidationPerformed => {
            writeln!(out, "{}", style.note(result_line))?;
            writeln!(
                out,
                "  All {skipped} backup{} skipped (ERROR/CORRUPT status).",
                plural_was(skipped)
            )?;
            writeln!(out, "  No backups were available for validation.")?;
            return Ok(ExitCode::Success);
        }
        Verdict::Ok => {
            writeln!(out, "{}", style.ok(result_line))?;
            writeln!(
                out,
                "  All {} validated backup{} passed checks successfully.",
                summary.backups_validated,
                plural(summary.backups_validated)
            )?;
        }
    }

    if skipped > 0 {
        writeln!(
            out,
            "  {skipped} backup{} skipped due to ERROR/CORRUPT status.",
            plural_was(skipped)
        )?;
    }

    Ok(match verdict {
        Verdict::Failed | Verdict::Warning => ExitCode::ValidationFailed,
        Verdict::Ok | Verdict::NoValidationPerformed => ExitCode::Success,
    })
}
