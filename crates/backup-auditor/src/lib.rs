//! # backup-auditor
//! Inventories PostgreSQL physical backups made by pg_basebackup, pg_probackup
//! and pgBackRest, normalizes their metadata and validates them against a WAL
//! archive.
//!

#![warn(missing_docs)]

pub mod adapter;
pub mod cli;
pub mod config;
pub mod context;
pub mod manifest;
pub mod output;
pub mod record;
pub mod registry;
pub mod scanner;
pub mod validation;
pub mod wal_archive;

pub use config::{Config, LoadConfigError};
pub use context::Context;
pub use record::{BackupKind, BackupRecord, BackupStatus, BackupTool};
pub use registry::Registry;
pub use wal_archive::{WalArchive, WalGap};
