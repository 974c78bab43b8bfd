//! pgBackRest repositories: stanza catalogs and per-backup manifests.
//!

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::{KeyValueFile, Lsn, WalSegmentName};
use tracing::{debug, warn};

use crate::{
    context::Context,
    record::{BackupKind, BackupRecord, BackupStatus, BackupTool, parse_server_version},
};

use super::{BackupAdapter, ScanOptions, from_epoch, is_directory, is_file};

/// The per-stanza backup catalog.
pub const CATALOG_FILE: &str = "backup.info";

/// The per-backup manifest.
pub const MANIFEST_FILE: &str = "backup.manifest";

/// A pgBackRest repository holding one or more stanzas.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PgBackRest;

/// One value of the `[backup:current]` catalog section.
///
/// Fields are read one by one so that a single malformed field leaves the
/// rest of the entry usable.
#[derive(Debug, Default)]
struct CatalogEntry {
    backup_type: Option<String>,
    backup_timestamp_start: Option<i64>,
    backup_timestamp_stop: Option<i64>,
    backup_lsn_start: Option<String>,
    backup_lsn_stop: Option<String>,
    backup_size: Option<u64>,
    backup_info_size: Option<u64>,
    backup_prior: Option<String>,
    backup_archive_start: Option<String>,
}

impl CatalogEntry {
    /// `None` when the value is not a JSON object.
    fn parse(value: &str) -> Option<Self> {
        let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(value) else {
            return None;
        };

        let text = |key: &str| match fields.get(key) {
            Some(Value::String(text)) => Some(text.clone()),
            _ => None,
        };
        let integer = |key: &str| match fields.get(key) {
            Some(Value::Number(number)) => number.as_i64(),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        };
        let size = |key: &str| match fields.get(key) {
            Some(Value::Number(number)) => number.as_u64(),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        };

        Some(Self {
            backup_type: text("backup-type"),
            backup_timestamp_start: integer("backup-timestamp-start"),
            backup_timestamp_stop: integer("backup-timestamp-stop"),
            backup_lsn_start: text("backup-lsn-start"),
            backup_lsn_stop: text("backup-lsn-stop"),
            backup_size: size("backup-size"),
            backup_info_size: size("backup-info-size"),
            backup_prior: text("backup-prior"),
            backup_archive_start: text("backup-archive-start"),
        })
    }
}

impl BackupAdapter for PgBackRest {
    fn name(&self) -> &'static str {
        "pgBackRest"
    }

    fn tool(&self) -> BackupTool {
        BackupTool::PgBackRest
    }

    fn detect(&self, path: &Path) -> bool {
        let detected = is_directory(&path.join("backup")) && is_directory(&path.join("archive"));

        if detected {
            debug!("Detected pgBackRest repository at {path:?}");
        }

        detected
    }

    fn scan(&self, path: &Path, _options: &ScanOptions) -> Vec<BackupRecord> {
        let backup_root = path.join("backup");

        let Ok(entries) = fs::read_dir(&backup_root) else {
            warn!("Could not read {backup_root:?}");
            return Vec::new();
        };

        let mut stanzas: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|stanza| is_directory(stanza) && is_file(&stanza.join(CATALOG_FILE)))
            .collect();
        stanzas.sort();

        stanzas
            .iter()
            .flat_map(|stanza| scan_stanza(stanza))
            .collect()
    }

    fn owns_subtree(&self) -> bool {
        true
    }
}

/// Records for every backup in one stanza's catalog, in catalog order.
fn scan_stanza(stanza_path: &Path) -> Vec<BackupRecord> {
    let stanza = stanza_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let context = Context {
        backup: None,
        current_context: "Catalog",
    };
    debug!("{context}Reading stanza {stanza} at {stanza_path:?}");

    let catalog = match KeyValueFile::load(&stanza_path.join(CATALOG_FILE)) {
        Ok(catalog) => catalog,
        Err(error) => {
            warn!("{context}Failed to read {CATALOG_FILE} for stanza {stanza}: {error}");
            return Vec::new();
        }
    };

    let Some(current) = catalog.section("backup:current") else {
        warn!("{context}{CATALOG_FILE} for stanza {stanza} has no [backup:current] section");
        return Vec::new();
    };

    let tool_version = catalog
        .get("backrest", "backrest-version")
        .map(str::to_string);

    current
        .iter()
        .map(|(backup_id, value)| {
            let path = stanza_path.join(backup_id);
            let mut record = BackupRecord::new(BackupTool::PgBackRest, backup_id, &path);
            record.instance = Some(stanza.clone());
            record.tool_version.clone_from(&tool_version);

            let context = Context::for_record(&record, "Catalog");
            match CatalogEntry::parse(value) {
                Some(entry) => apply_catalog_entry(&mut record, &entry),
                None => {
                    warn!("{context}Catalog entry is not a JSON object");
                    record.status = BackupStatus::Error;
                    return record;
                }
            }

            apply_manifest(&context, &mut record, &path.join(MANIFEST_FILE));
            record
        })
        .collect()
}

fn apply_catalog_entry(record: &mut BackupRecord, entry: &CatalogEntry) {
    if let Some(kind) = entry.backup_type.as_deref().and_then(parse_kind) {
        record.kind = kind;
    }

    record.start_time = entry.backup_timestamp_start.and_then(from_epoch);
    record.end_time = entry.backup_timestamp_stop.and_then(from_epoch);
    record.start_lsn = parse_lsn(entry.backup_lsn_start.as_deref());
    record.stop_lsn = parse_lsn(entry.backup_lsn_stop.as_deref());
    record.data_bytes = entry.backup_size.or(entry.backup_info_size).unwrap_or_default();
    record.parent_backup_id.clone_from(&entry.backup_prior);

    if let Some(archive_start) = &entry.backup_archive_start {
        apply_archive_start(record, archive_start);
    }
}

/// Manifest values override the catalog. A missing manifest is not an error.
fn apply_manifest(context: &Context, record: &mut BackupRecord, manifest_path: &Path) {
    if !is_file(manifest_path) {
        debug!("{context}No manifest at {manifest_path:?}");
        return;
    }

    let manifest = match KeyValueFile::load(manifest_path) {
        Ok(manifest) => manifest,
        Err(error) => {
            warn!("{context}Failed to read the manifest: {error}");
            return;
        }
    };

    if let Some(kind) = manifest.get("backup", "backup-type").and_then(parse_kind) {
        record.kind = kind;
    }
    if let Some(time) = epoch_value(manifest.get("backup", "backup-timestamp-start")) {
        record.start_time = Some(time);
    }
    if let Some(time) = epoch_value(manifest.get("backup", "backup-timestamp-stop")) {
        record.end_time = Some(time);
    }
    if let Some(lsn) = manifest.get("backup", "backup-lsn-start") {
        record.start_lsn = parse_lsn(Some(lsn));
    }
    if let Some(lsn) = manifest.get("backup", "backup-lsn-stop") {
        record.stop_lsn = parse_lsn(Some(lsn));
    }
    if let Some(prior) = manifest.get("backup", "backup-prior") {
        record.parent_backup_id = Some(prior.to_string());
    }
    if let Some(archive_start) = manifest.get("backup", "backup-archive-start") {
        apply_archive_start(record, archive_start);
    }
    if let Some(version) = manifest.get("backup:db", "db-version") {
        record.pg_version = parse_server_version(version);
    }
}

fn apply_archive_start(record: &mut BackupRecord, archive_start: &str) {
    record.wal_start_file = Some(archive_start.to_string());

    if let Some(segment) = WalSegmentName::parse_file_name(archive_start) {
        record.timeline = segment.timeline;
    }
}

fn parse_kind(value: &str) -> Option<BackupKind> {
    match value {
        "full" => Some(BackupKind::Full),
        "incr" => Some(BackupKind::Incremental),
        "diff" => Some(BackupKind::Delta),
        _ => None,
    }
}

fn parse_lsn(value: Option<&str>) -> Lsn {
    value
        .and_then(|value| value.parse().ok())
        .unwrap_or(Lsn::INVALID)
}

fn epoch_value(value: Option<&str>) -> Option<DateTime<Utc>> {
    value?.trim().parse().ok().and_then(from_epoch)
}
