//! Parent chains of incremental backups.
//!

use std::collections::HashSet;

use super::ValidationResult;
use crate::record::{BackupKind, BackupRecord, BackupStatus, BackupTool};

/// Walks the parent chain of `record` through `inventory`.
///
/// Parents are looked up by identifier among backups of the same tool and
/// instance. The walk ends at the first FULL backup.
pub fn validate_chain(record: &BackupRecord, inventory: &[BackupRecord]) -> ValidationResult {
    let mut result = ValidationResult::default();

    if record.kind == BackupKind::Full {
        return result;
    }

    let Some(parent_id) = record.parent_backup_id.as_deref() else {
        if record.tool == BackupTool::PgProbackup {
            result.warning(format!(
                "{} backup has no parent backup recorded",
                record.kind
            ));
        }
        return result;
    };

    if let Some(parent) = find_backup(inventory, record, parent_id) {
        if parent.start_lsn.is_valid()
            && record.start_lsn.is_valid()
            && parent.start_lsn > record.start_lsn
        {
            result.error(format!(
                "Parent backup {} starts at {} which is after this backup's start_lsn ({})",
                parent.backup_id, parent.start_lsn, record.start_lsn
            ));
        }
    }

    let mut visited = HashSet::from([record.backup_id.as_str()]);
    let mut next = Some(parent_id);

    while let Some(ancestor_id) = next {
        if !visited.insert(ancestor_id) {
            result.error(format!("Backup chain contains a cycle at {ancestor_id}"));
            break;
        }

        let Some(ancestor) = find_backup(inventory, record, ancestor_id) else {
            result.error(format!("Parent backup not found: {ancestor_id}"));
            break;
        };

        if ancestor.status != BackupStatus::Ok {
            result.error(format!(
                "Parent backup {} has status {}",
                ancestor.backup_id, ancestor.status
            ));
        }

        if ancestor.kind == BackupKind::Full {
            break;
        }

        next = ancestor.parent_backup_id.as_deref();
        if next.is_none() {
            result.error(format!(
                "Backup chain ends at {} which is not a FULL backup",
                ancestor.backup_id
            ));
        }
    }

    result
}

fn find_backup<'a>(
    inventory: &'a [BackupRecord],
    child: &BackupRecord,
    backup_id: &str,
) -> Option<&'a BackupRecord> {
    inventory.iter().find(|candidate| {
        candidate.tool == child.tool
            && candidate.instance == child.instance
            && candidate.backup_id == backup_id
    })
}
