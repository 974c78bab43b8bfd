//! Directory walks producing the backup inventory and the WAL archive
//! inventory.
//!

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use shared::WalSegmentName;
use thiserror::Error;
use tracing::debug;

use crate::{
    adapter::{BackupAdapter, ScanOptions},
    record::BackupRecord,
    registry::Registry,
    wal_archive::WalArchive,
};

/// Suffixes of compressed segment files that still count as present.
pub const COMPRESSED_SEGMENT_SUFFIXES: [&str; 4] = [".gz", ".lz4", ".zst", ".bz2"];

/// Walks `root` and returns every backup the registry recognizes.
///
/// `max_depth` of `None` is unlimited, `Some(0)` looks at `root` alone. The
/// walk is pre-order with children visited in name order. Symlinked
/// directories are not followed and unreadable directories are skipped.
pub fn scan_backup_directory(
    root: &Path,
    max_depth: Option<usize>,
    registry: &Registry,
    options: &ScanOptions,
) -> Result<Vec<BackupRecord>, ScanError> {
    check_root(root)?;
    debug!("Starting backup scan of {root:?} (max_depth={max_depth:?})");

    let mut records = Vec::new();
    let mut stack: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), 0)];

    while let Some((directory, depth)) = stack.pop() {
        debug!("Scanning directory (depth={depth}) {directory:?}");

        if let Some(adapter) = registry.detect(&directory) {
            debug!("Detected {} backup at {directory:?}", adapter.name());
            records.extend(adapter.scan(&directory, options));

            if adapter.owns_subtree() {
                continue;
            }
        }

        if max_depth.is_some_and(|max_depth| depth >= max_depth) {
            continue;
        }

        let mut children = match child_directories(&directory) {
            Ok(children) => children,
            Err(error) => {
                debug!("Cannot read directory {directory:?}: {error}");
                continue;
            }
        };

        // Reverse so the smallest name is popped first.
        children.sort();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    Ok(records)
}

/// Lists the segment files in one flat WAL archive directory.
///
/// Names that are not segment names are ignored, except that a compressed
/// segment (`.gz`, `.lz4`, `.zst`, `.bz2`) counts as its segment.
pub fn scan_wal_archive(directory: &Path) -> Result<WalArchive, ScanError> {
    check_root(directory)?;

    let entries = fs::read_dir(directory)
        .map_err(|error| ScanError::ReadDirectory(directory.to_path_buf(), error))?;

    let mut segments = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        if !entry.file_type().is_ok_and(|file_type| file_type.is_file()) {
            continue;
        }

        let name = entry.file_name();
        let name = name.to_string_lossy();

        match segment_from_file_name(&name) {
            Some(segment) => segments.push(segment),
            None => debug!("Ignoring {name} in WAL archive"),
        }
    }

    debug!("Found {} WAL segments in {directory:?}", segments.len());
    Ok(WalArchive::new(directory.to_path_buf(), segments))
}

/// The segment a WAL archive file holds, if any.
pub fn segment_from_file_name(name: &str) -> Option<WalSegmentName> {
    if let Some(segment) = WalSegmentName::parse_file_name(name) {
        return Some(segment);
    }

    COMPRESSED_SEGMENT_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .and_then(WalSegmentName::parse_file_name)
}

fn child_directories(directory: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();

    for entry in fs::read_dir(directory)? {
        let entry = entry?;

        // `file_type` does not follow symlinks.
        if entry.file_type().is_ok_and(|file_type| file_type.is_dir()) {
            children.push(entry.path());
        }
    }

    Ok(children)
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::NotDirectory(root.to_path_buf())),
        Err(_) => Err(ScanError::Missing(root.to_path_buf())),
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Directory does not exist: {0:?}")]
    Missing(PathBuf),

    #[error("Path is not a directory: {0:?}")]
    NotDirectory(PathBuf),

    #[error("Failed to read directory {0:?}:\n{1}")]
    ReadDirectory(PathBuf, #[source] io::Error),
}
