//! Log prefix for the backup being worked on
//!

use core::fmt;

use crate::record::{BackupRecord, BackupTool};

/// Holds the context for the backup being worked on. Used for prefixing logs.
#[derive(Default, Debug, Clone)]
pub struct Context {
    /// The tool and identifier of the backup.
    pub backup: Option<(BackupTool, String)>,
    /// The current stage.
    pub current_context: &'static str,
}

impl Context {
    /// A context for `record` at stage `current_context`.
    pub fn for_record(record: &BackupRecord, current_context: &'static str) -> Self {
        Self {
            backup: Some((record.tool, record.backup_id.clone())),
            current_context,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((tool, backup_id)) = &self.backup {
            write!(f, "[{tool}/{backup_id}] ")?;
        }

        if !self.current_context.is_empty() {
            write!(f, "[{}] ", self.current_context)?;
        }

        Ok(())
    }
}
