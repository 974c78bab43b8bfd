//! The `backup_manifest` JSON document written next to a base backup.
//!

use std::{fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

/// A parsed `backup_manifest`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct BackupManifest {
    /// Manifest format version.
    #[serde(rename = "PostgreSQL-Backup-Manifest-Version", default)]
    pub version: u32,

    /// Every file in the backup.
    #[serde(rename = "Files", default)]
    pub files: Vec<ManifestFile>,

    /// The WAL needed to make the backup consistent.
    #[serde(rename = "WAL-Ranges", default)]
    pub wal_ranges: Vec<ManifestWalRange>,
}

/// One file listed in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestFile {
    /// Path relative to the backup root. Absent for non UTF-8 names, which
    /// use `Encoded-Path` instead.
    #[serde(rename = "Path")]
    pub path: Option<String>,

    /// Hex encoded path for names that are not valid UTF-8.
    #[serde(rename = "Encoded-Path")]
    pub encoded_path: Option<String>,

    #[allow(missing_docs)]
    #[serde(rename = "Size")]
    pub size: u64,

    /// `NONE`, `CRC32C` or one of the SHA-2 family.
    #[serde(rename = "Checksum-Algorithm", default)]
    pub checksum_algorithm: Option<String>,

    /// Lower case hex digest.
    #[serde(rename = "Checksum", default)]
    pub checksum: Option<String>,
}

/// One contiguous WAL range.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestWalRange {
    #[allow(missing_docs)]
    #[serde(rename = "Timeline")]
    pub timeline: u32,

    #[allow(missing_docs)]
    #[serde(rename = "Start-LSN")]
    pub start_lsn: String,

    #[allow(missing_docs)]
    #[serde(rename = "End-LSN")]
    pub end_lsn: Option<String>,
}

impl BackupManifest {
    /// Reads and parses a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path).map_err(ManifestError::Read)?;
        let manifest = serde_json::from_str(&contents)?;
        Ok(manifest)
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read the manifest:\n{0}")]
    Read(#[source] io::Error),

    #[error("Failed to deserialize the manifest:\n{0}")]
    Deserialize(#[from] serde_json::Error),
}
