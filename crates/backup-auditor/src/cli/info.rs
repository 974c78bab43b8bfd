use core::fmt::Display;
use std::{io::Write, path::PathBuf};

use clap::Args;
use shared::Lsn;
use tracing::info;

use super::{CommandError, ExitCode};
use crate::{
    config::Config,
    output::{Style, format_duration, format_time, format_total_size},
    record::BackupRecord,
    registry::Registry,
    scanner::scan_backup_directory,
};

const BANNER: &str = "====================================================";

#[allow(missing_docs)]
#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Path of the backup itself.
    #[arg(short = 'p', long)]
    pub backup_path: Option<PathBuf>,

    /// Directory to search, together with `--backup-id`.
    #[arg(short = 'B', long)]
    pub backup_dir: Option<PathBuf>,

    /// Identifier of the backup to show.
    #[arg(short = 'i', long)]
    pub backup_id: Option<String>,
}

/// The `info` command.
pub fn info(
    args: &InfoArgs,
    config: &Config,
    style: Style,
    out: &mut dyn Write,
) -> Result<ExitCode, CommandError> {
    let registry = Registry::default();
    let options = config.scan_options();

    let record = match (&args.backup_path, &args.backup_dir, &args.backup_id) {
        (Some(path), _, _) => {
            info!("Loading backup from: {path:?}");
            scan_backup_directory(path, Some(0), &registry, &options)?
                .into_iter()
                .next()
                .ok_or_else(|| CommandError::NoBackupAtPath(path.clone()))?
        }
        (None, Some(directory), Some(backup_id)) => {
            info!("Searching for backup ID '{backup_id}' in: {directory:?}");
            scan_backup_directory(directory, None, &registry, &options)?
                .into_iter()
                .find(|record| record.backup_id == *backup_id)
                .ok_or_else(|| CommandError::BackupNotFound(backup_id.clone()))?
        }
        _ => {
            return Err(CommandError::InvalidArguments(
                "Either --backup-path or (--backup-dir + --backup-id) is required".to_string(),
            ));
        }
    };

    write_backup_info(&record, style, out)?;
    Ok(ExitCode::Success)
}

fn size_with_bytes(bytes: u64) -> String {
    format!("{} ({bytes} bytes)", format_total_size(bytes))
}

/// Writes the detail view of one backup.
pub fn write_backup_info(
    record: &BackupRecord,
    style: Style,
    out: &mut dyn Write,
) -> Result<(), CommandError> {
    writeln!(out, "{BANNER}")?;
    writeln!(out, "Backup Information")?;
    writeln!(out, "{BANNER}")?;
    writeln!(out)?;

    writeln!(out, "GENERAL:")?;
    field(out, "Backup ID", &record.backup_id)?;
    field(out, "Node", &record.node)?;
    if let Some(instance) = &record.instance {
        field(out, "Instance", instance)?;
    }
    field(out, "Type", record.kind)?;
    field(out, "Tool", record.tool)?;
    if let Some(version) = &record.tool_version {
        field(out, "Tool Version", version)?;
    }
    field(out, "Status", style.status(record.status, 0))?;
    writeln!(out)?;

    let duration = match (record.start_time, record.end_time) {
        (Some(start), Some(end)) if end >= start => {
            format_duration((end - start).num_seconds())
        }
        _ => "N/A".to_string(),
    };

    writeln!(out, "TIMING:")?;
    field(out, "Start Time", format_time(record.start_time))?;
    field(out, "End Time", format_time(record.end_time))?;
    field(out, "Duration", duration)?;
    writeln!(out)?;

    writeln!(out, "STORAGE:")?;
    field(out, "Path", record.path.display())?;
    if record.data_bytes > 0 {
        field(out, "Size", size_with_bytes(record.data_bytes))?;
    } else {
        field(out, "Size", "N/A")?;
    }
    if record.wal_bytes > 0 {
        field(out, "WAL Size", size_with_bytes(record.wal_bytes))?;
    }
    writeln!(out)?;

    writeln!(out, "POSTGRESQL:")?;
    if record.pg_version > 0 {
        field(out, "PG Version", record.pg_version / 10_000)?;
    } else {
        field(out, "PG Version", "N/A")?;
    }
    if record.timeline > 0 {
        field(out, "Timeline", record.timeline)?;
    } else {
        field(out, "Timeline", "N/A")?;
    }
    optional_lsn(out, "Start LSN", record.start_lsn)?;
    optional_lsn(out, "Stop LSN", record.stop_lsn)?;
    if record.start_lsn.is_valid() && record.stop_lsn.is_valid() {
        field(
            out,
            "WAL Range",
            format!("{} -> {}", record.start_lsn, record.stop_lsn),
        )?;
    }

    let extended = [
        ("WAL Start File", &record.wal_start_file),
        ("Backup Method", &record.backup_method),
        ("Backup From", &record.backup_from),
        ("Label", &record.label),
    ];
    for (label, value) in extended {
        if let Some(value) = value {
            field(out, label, value)?;
        }
    }
    writeln!(out)?;

    writeln!(out, "{BANNER}")?;
    Ok(())
}

fn field(
    out: &mut dyn Write,
    label: &str,
    value: impl Display,
) -> Result<(), CommandError> {
    writeln!(out, "  {:<17}{value}", format!("{label}:"))?;
    Ok(())
}

fn optional_lsn(out: &mut dyn Write, label: &str, lsn: Lsn) -> Result<(), CommandError> {
    if lsn.is_valid() {
        field(out, label, lsn)
    } else {
        field(out, label, "N/A")
    }
}
