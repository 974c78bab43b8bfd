//! Ordered adapter lookup.
//!

use std::path::Path;

use crate::adapter::{Adapter, BackupAdapter, PgBackRest, PgBasebackup, PgProbackup};

/// The adapters in detection order.
///
/// pg_probackup comes before pg_basebackup because a pg_probackup
/// `database/` directory looks like a plain base backup.
#[derive(Debug, Clone)]
pub struct Registry {
    adapters: Vec<Adapter>,
}

impl Registry {
    /// A registry holding only `adapters`, tried in the given order.
    pub fn with_adapters(adapters: Vec<Adapter>) -> Self {
        Self { adapters }
    }

    /// The first adapter that recognizes `path`.
    pub fn detect(&self, path: &Path) -> Option<&Adapter> {
        self.adapters.iter().find(|adapter| adapter.detect(path))
    }

    /// The adapter with the given name, compared case-insensitively.
    pub fn by_name(&self, name: &str) -> Option<&Adapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.name().eq_ignore_ascii_case(name))
    }

    /// The adapters in detection order.
    pub fn adapters(&self) -> &[Adapter] {
        &self.adapters
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_adapters(vec![
            Adapter::PgProbackup(PgProbackup),
            Adapter::PgBackRest(PgBackRest),
            Adapter::PgBasebackup(PgBasebackup),
        ])
    }
}
