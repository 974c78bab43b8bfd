//! Reads single members out of base backup tar archives.
//!

use core::time::Duration;
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::mpsc::{self, RecvTimeoutError},
    thread,
};

use flate2::read::GzDecoder;
use tar::Archive;
use thiserror::Error;
use tracing::debug;

/// Members larger than this are truncated; the auditor only reads small text
/// files such as `backup_label` and `PG_VERSION`.
const MAX_MEMBER_BYTES: u64 = 1024 * 1024;

/// The compression applied to a tar archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// A bare `.tar`.
    None,
    /// `.tar.gz` or `.tgz`.
    Gzip,
}

impl Compression {
    /// Infers the compression from the file name suffix.
    pub fn from_file_name(name: &str) -> Result<Self, ArchiveError> {
        if name.ends_with(".tar") {
            Ok(Self::None)
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Ok(Self::Gzip)
        } else {
            let suffix = name.rsplit_once('.').map_or(name, |(_, suffix)| suffix);
            Err(ArchiveError::UnsupportedCompression(suffix.to_string()))
        }
    }
}

/// Reads `member` out of the tar archive at `archive`.
///
/// The read happens on a worker thread and is abandoned after `timeout`.
/// Returns `Ok(None)` when the archive has no such member.
pub fn read_member(
    archive: &Path,
    member: &str,
    timeout: Duration,
) -> Result<Option<Vec<u8>>, ArchiveError> {
    let name = archive
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let compression = Compression::from_file_name(&name)?;

    let (sender, receiver) = mpsc::channel();
    let archive_path = archive.to_path_buf();
    let member_name = member.to_string();

    thread::Builder::new()
        .name("archive-reader".to_string())
        .spawn(move || {
            let result = read_member_blocking(&archive_path, &member_name, compression);
            // The receiver is gone if the read timed out.
            let _ = sender.send(result);
        })
        .map_err(ArchiveError::SpawnWorker)?;

    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(ArchiveError::Timeout(archive.to_path_buf(), timeout)),
        Err(RecvTimeoutError::Disconnected) => Err(ArchiveError::WorkerStopped),
    }
}

fn read_member_blocking(
    archive: &Path,
    member: &str,
    compression: Compression,
) -> Result<Option<Vec<u8>>, ArchiveError> {
    let file = File::open(archive).map_err(ArchiveError::Open)?;

    match compression {
        Compression::None => find_member(Archive::new(file), member),
        Compression::Gzip => find_member(Archive::new(GzDecoder::new(file)), member),
    }
}

fn find_member<R: Read>(
    mut archive: Archive<R>,
    member: &str,
) -> Result<Option<Vec<u8>>, ArchiveError> {
    let entries = archive.entries().map_err(ArchiveError::Read)?;

    for entry in entries {
        let entry = entry.map_err(ArchiveError::Read)?;

        let matches = {
            let path = entry.path().map_err(ArchiveError::Read)?;
            let path: &Path = &path;
            path.strip_prefix(".").unwrap_or(path) == Path::new(member)
        };
        if !matches {
            continue;
        }

        let mut contents = Vec::new();
        entry
            .take(MAX_MEMBER_BYTES)
            .read_to_end(&mut contents)
            .map_err(ArchiveError::Read)?;

        return Ok(Some(contents));
    }

    debug!("Archive has no member {member}");
    Ok(None)
}

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("Failed to open the archive:\n{0}")]
    Open(#[source] io::Error),

    #[error("Failed to read the archive:\n{0}")]
    Read(#[source] io::Error),

    #[error("Failed to spawn the archive reader:\n{0}")]
    SpawnWorker(#[source] io::Error),

    #[error("Reading {0:?} did not finish within {1:?}")]
    Timeout(PathBuf, Duration),

    #[error("The archive reader stopped without a result")]
    WorkerStopped,
}
