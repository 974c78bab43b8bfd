use core::cmp::Ordering;
use std::{
    collections::BTreeMap,
    io::Write,
    path::{Path, PathBuf},
};

use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;

use super::{CommandError, ExitCode};
use crate::{
    adapter::BackupAdapter,
    config::Config,
    output::{Style, format_size, format_time, format_total_size},
    record::{BackupRecord, BackupStatus, BackupTool},
    registry::Registry,
    scanner::scan_backup_directory,
};

#[allow(missing_docs)]
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Directory to search for backups.
    #[arg(short = 'B', long)]
    pub backup_dir: PathBuf,

    /// Only list backups made by this tool.
    #[arg(short = 't', long = "type", value_enum, default_value_t = TypeFilter::Auto)]
    pub type_filter: TypeFilter,

    /// Only list backups with this status.
    #[arg(short = 's', long = "status", value_enum, default_value_t = StatusFilter::All)]
    pub status_filter: StatusFilter,

    #[arg(short = 'f', long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    #[arg(long, value_enum, default_value_t = SortBy::Time)]
    pub sort_by: SortBy,

    /// Reverse the sort order.
    #[arg(short, long)]
    pub reverse: bool,

    /// Show at most this many backups per directory, 0 for all.
    #[arg(short = 'n', long, default_value_t = 0)]
    pub limit: usize,

    /// How deep to search, -1 for unlimited.
    #[arg(short = 'd', long, allow_negative_numbers = true)]
    pub max_depth: Option<i64>,
}

/// Which tool's backups to keep.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeFilter {
    Auto,
    #[value(name = "pg_basebackup")]
    PgBasebackup,
    #[value(name = "pg_probackup")]
    PgProbackup,
    #[value(name = "pgbackrest")]
    PgBackRest,
}

impl TypeFilter {
    /// The adapter name this filter selects, `None` for every tool.
    fn adapter_name(self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            Self::PgBasebackup => Some("pg_basebackup"),
            Self::PgProbackup => Some("pg_probackup"),
            Self::PgBackRest => Some("pgbackrest"),
        }
    }

    /// The tool this filter selects.
    pub fn tool(self, registry: &Registry) -> Option<BackupTool> {
        self.adapter_name()
            .and_then(|name| registry.by_name(name))
            .map(BackupAdapter::tool)
    }
}

/// Which statuses to keep.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusFilter {
    All,
    Ok,
    Warning,
    Error,
    Corrupt,
    Orphan,
    Running,
}

impl StatusFilter {
    #[allow(missing_docs)]
    pub fn matches(self, status: BackupStatus) -> bool {
        match self {
            Self::All => true,
            Self::Ok => status == BackupStatus::Ok,
            Self::Warning => status == BackupStatus::Warning,
            Self::Error => status == BackupStatus::Error,
            Self::Corrupt => status == BackupStatus::Corrupt,
            Self::Orphan => status == BackupStatus::Orphan,
            Self::Running => status == BackupStatus::Running,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

/// Sort key within a directory group.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    Time,
    #[value(name = "end-time", alias = "end_time")]
    EndTime,
    Name,
    Size,
}

impl SortBy {
    fn compare(self, a: &BackupRecord, b: &BackupRecord) -> Ordering {
        match self {
            Self::Time => a.start_time.cmp(&b.start_time),
            // Backups still running have no end time and go last.
            Self::EndTime => match (a.end_time, b.end_time) {
                (Some(a), Some(b)) => a.cmp(&b),
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (None, None) => Ordering::Equal,
            },
            Self::Name => a.backup_id.cmp(&b.backup_id),
            Self::Size => a.data_bytes.cmp(&b.data_bytes),
        }
    }
}

/// Backups sharing a parent directory.
#[derive(Debug, Serialize)]
pub struct Group<'a> {
    #[allow(missing_docs)]
    pub directory: &'a Path,
    /// The instance or stanza of the first backup.
    pub instance: Option<&'a str>,
    #[allow(missing_docs)]
    pub backups: Vec<&'a BackupRecord>,
}

#[derive(Serialize)]
struct ListReport<'a> {
    groups: &'a [Group<'a>],
    total_backups: usize,
    total_bytes: u64,
}

/// Filters, groups by parent directory in path order, sorts and limits.
pub fn select_groups<'a>(
    records: &'a [BackupRecord],
    tool: Option<BackupTool>,
    status: StatusFilter,
    sort_by: SortBy,
    reverse: bool,
    limit: usize,
) -> Vec<Group<'a>> {
    let mut by_directory: BTreeMap<&Path, Vec<&BackupRecord>> = BTreeMap::new();

    for record in records {
        if tool.is_some_and(|tool| tool != record.tool) || !status.matches(record.status) {
            continue;
        }

        let directory = record.parent_directory().unwrap_or_else(|| Path::new(""));
        by_directory.entry(directory).or_default().push(record);
    }

    by_directory
        .into_iter()
        .map(|(directory, mut backups)| {
            backups.sort_by(|a, b| sort_by.compare(a, b));
            if reverse {
                backups.reverse();
            }
            if limit > 0 {
                backups.truncate(limit);
            }

            Group {
                directory,
                instance: backups.first().and_then(|record| record.instance.as_deref()),
                backups,
            }
        })
        .collect()
}

/// Resolves `-d` against the config, rejecting depths below -1.
pub(crate) fn resolve_max_depth(
    argument: Option<i64>,
    config: &Config,
) -> Result<Option<usize>, CommandError> {
    match argument {
        Some(depth) if depth < -1 => Err(CommandError::InvalidArguments(
            "--max-depth must be >= -1".to_string(),
        )),
        Some(depth) => Ok(usize::try_from(depth).ok()),
        None => Ok(config.scan.max_depth()),
    }
}

/// The `list` command.
pub fn list(
    args: &ListArgs,
    config: &Config,
    style: Style,
    out: &mut dyn Write,
) -> Result<ExitCode, CommandError> {
    let max_depth = resolve_max_depth(args.max_depth, config)?;
    let registry = Registry::default();

    info!("Scanning backup directory: {:?}", args.backup_dir);
    let records = scan_backup_directory(
        &args.backup_dir,
        max_depth,
        &registry,
        &config.scan_options(),
    )?;

    if records.is_empty() {
        return Err(CommandError::NoBackupsFound(args.backup_dir.clone()));
    }

    let groups = select_groups(
        &records,
        args.type_filter.tool(&registry),
        args.status_filter,
        args.sort_by,
        args.reverse,
        args.limit,
    );

    let total_backups: usize = groups.iter().map(|group| group.backups.len()).sum();
    let total_bytes: u64 = groups
        .iter()
        .flat_map(|group| &group.backups)
        .map(|record| record.data_bytes)
        .sum();

    match args.format {
        Format::Json => {
            let report = ListReport {
                groups: &groups,
                total_backups,
                total_bytes,
            };
            serde_json::to_writer_pretty(&mut *out, &report)?;
            writeln!(out)?;
        }
        Format::Table => {
            for group in &groups {
                write_group(group, style, out)?;
            }

            writeln!(out)?;
            writeln!(out, "Total backups found: {total_backups}")?;
            writeln!(out, "Total size: {}", format_total_size(total_bytes))?;
        }
    }

    info!("Total backups found: {total_backups}");
    Ok(ExitCode::Success)
}

fn write_group(group: &Group<'_>, style: Style, out: &mut dyn Write) -> Result<(), CommandError> {
    writeln!(out)?;
    writeln!(out, "Directory: {}", group.directory.display())?;
    if let Some(instance) = group.instance {
        writeln!(out, "Instance: {instance}")?;
    }

    writeln!(
        out,
        "{:<20} {:<16} {:<12} {:<16} {:<8} {:<19} {:<19} {:<10} {:<10}",
        "BACKUP ID", "NODE", "TYPE", "TOOL", "STATUS", "START TIME", "END TIME", "SIZE", "WAL SIZE"
    )?;
    writeln!(
        out,
        "{} {} {} {} {} {} {} {} {}",
        "-".repeat(20),
        "-".repeat(16),
        "-".repeat(12),
        "-".repeat(16),
        "-".repeat(8),
        "-".repeat(19),
        "-".repeat(19),
        "-".repeat(10),
        "-".repeat(10)
    )?;

    for record in &group.backups {
        writeln!(
            out,
            "{:<20} {:<16} {:<12} {:<16} {} {:<19} {:<19} {:<10} {:<10}",
            record.backup_id,
            record.node,
            record.kind.as_str(),
            record.tool.as_str(),
            style.status(record.status, 8),
            format_time(record.start_time),
            format_time(record.end_time),
            format_size(record.data_bytes).unwrap_or_else(|| "N/A".to_string()),
            format_size(record.wal_bytes).unwrap_or_else(|| "-".to_string()),
        )?;
    }

    Ok(())
}
