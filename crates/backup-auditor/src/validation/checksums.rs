//! File checksums against the backup manifest.
//!

use std::{
    fs::{self, File},
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use shared::KeyValueFile;
use tracing::{debug, warn};

use super::ValidationResult;
use crate::{
    adapter::{MANIFEST_FILE, PgBasebackup},
    context::Context,
    manifest::{BackupManifest, ManifestFile},
    record::{BackupRecord, BackupTool},
};

const BASEBACKUP_MANIFEST: &str = "backup_manifest";
const PROBACKUP_CONTENT: &str = "backup_content.control";
const READ_CHUNK: usize = 64 * 1024;

/// Suffixes pgBackRest may append to stored files.
const REPOSITORY_SUFFIXES: [&str; 5] = [".gz", ".lz4", ".zst", ".bz2", ".xz"];

/// Verifies the files listed in the backup's own manifest.
pub fn validate_checksums(record: &BackupRecord) -> ValidationResult {
    let context = Context::for_record(record, "Checksums");

    match record.tool {
        BackupTool::PgBasebackup => verify_basebackup(&context, &record.path),
        BackupTool::PgProbackup => verify_probackup(&context, &record.path),
        BackupTool::PgBackRest => verify_pgbackrest(&context, &record.path),
    }
}

fn no_manifest(context: &Context) -> ValidationResult {
    debug!("{context}No file manifest available");
    let mut result = ValidationResult::default();
    result.warning("No file manifest available, file verification skipped");
    result
}

fn verify_basebackup(context: &Context, path: &Path) -> ValidationResult {
    let mut result = ValidationResult::default();

    if PgBasebackup::is_tar_format(path) {
        result.warning("file verification not supported for tar format");
        return result;
    }

    let manifest_path = path.join(BASEBACKUP_MANIFEST);
    if !manifest_path.is_file() {
        return no_manifest(context);
    }

    let manifest = match BackupManifest::load(&manifest_path) {
        Ok(manifest) => manifest,
        Err(error) => {
            result.error(format!("Cannot read {BASEBACKUP_MANIFEST}: {error}"));
            return result;
        }
    };

    debug!("{context}Verifying {} files", manifest.files.len());
    for file in &manifest.files {
        verify_manifest_file(context, path, file, &mut result);
    }

    result
}

fn verify_manifest_file(
    context: &Context,
    root: &Path,
    file: &ManifestFile,
    result: &mut ValidationResult,
) {
    let Some(relative) = file.path.as_deref() else {
        if let Some(encoded) = &file.encoded_path {
            result.warning(format!("Cannot verify file with encoded path {encoded}"));
        }
        return;
    };

    let path = root.join(relative);
    let metadata = match fs::metadata(&path) {
        Ok(metadata) if metadata.is_file() => metadata,
        _ => {
            result.error(format!("Missing file: {relative}"));
            return;
        }
    };

    if metadata.len() != file.size {
        result.error(format!(
            "File size mismatch: {relative} (expected {}, found {})",
            file.size,
            metadata.len()
        ));
        return;
    }

    let (Some(algorithm), Some(expected)) = (&file.checksum_algorithm, &file.checksum) else {
        return;
    };

    match compute_checksum(algorithm, &path) {
        Ok(Some(actual)) if !actual.eq_ignore_ascii_case(expected) => {
            result.error(format!(
                "Checksum mismatch: {relative} ({algorithm} expected {expected}, found {actual})"
            ));
        }
        Ok(Some(_)) => {}
        Ok(None) => {
            if !algorithm.eq_ignore_ascii_case("NONE") {
                result.warning(format!(
                    "Unsupported checksum algorithm {algorithm} for {relative}"
                ));
            }
        }
        Err(error) => {
            warn!("{context}Failed to read {path:?}: {error}");
            result.error(format!("Cannot read file: {relative}"));
        }
    }
}

/// Hex digest of `path`, or `None` for an unsupported or `NONE` algorithm.
pub fn compute_checksum(algorithm: &str, path: &Path) -> io::Result<Option<String>> {
    match algorithm.to_ascii_uppercase().as_str() {
        "SHA224" => digest_file::<Sha224>(path).map(Some),
        "SHA256" => digest_file::<Sha256>(path).map(Some),
        "SHA384" => digest_file::<Sha384>(path).map(Some),
        "SHA512" => digest_file::<Sha512>(path).map(Some),
        "CRC32C" => crc32c_file(path).map(Some),
        _ => Ok(None),
    }
}

fn digest_file<D: Digest>(path: &Path) -> io::Result<String> {
    let mut hasher = D::new();
    for_each_chunk(path, |chunk| hasher.update(chunk))?;
    Ok(to_hex(&hasher.finalize()))
}

/// The manifest stores the CRC in memory order, which is little endian.
fn crc32c_file(path: &Path) -> io::Result<String> {
    let mut crc = 0_u32;
    for_each_chunk(path, |chunk| crc = crc32c::crc32c_append(crc, chunk))?;
    Ok(to_hex(&crc.to_le_bytes()))
}

fn for_each_chunk(path: &Path, mut f: impl FnMut(&[u8])) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buffer = vec![0_u8; READ_CHUNK];

    loop {
        let read = reader.read(&mut buffer)?;
        let Some(chunk) = buffer.get(..read) else {
            break;
        };
        if chunk.is_empty() {
            break;
        }
        f(chunk);
    }

    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// One line of `backup_content.control`. pg_probackup writes numbers as
/// strings.
#[derive(Debug, Deserialize)]
struct ContentEntry {
    path: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    write_size: Option<Value>,
    #[serde(default)]
    external_dir_num: Option<Value>,
}

impl ContentEntry {
    fn is_stored(&self) -> bool {
        self.kind.as_deref() == Some("reg")
            && !self.write_size.as_ref().is_some_and(|size| number(size) == Some(-1))
            && self
                .external_dir_num
                .as_ref()
                .and_then(number)
                .is_none_or(|dir| dir == 0)
    }
}

fn number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn verify_probackup(context: &Context, path: &Path) -> ValidationResult {
    let content_path = path.join(PROBACKUP_CONTENT);
    let file = match File::open(&content_path) {
        Ok(file) => file,
        Err(_) => return no_manifest(context),
    };

    let mut result = ValidationResult::default();
    let database = path.join("database");

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                result.error(format!("Cannot read {PROBACKUP_CONTENT}: {error}"));
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let entry: ContentEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(error) => {
                result.error(format!(
                    "Invalid entry on line {} of {PROBACKUP_CONTENT}: {error}",
                    index + 1
                ));
                continue;
            }
        };

        if entry.is_stored() && !database.join(&entry.path).is_file() {
            result.error(format!("Missing file: {}", entry.path));
        }
    }

    result
}

#[derive(Debug, Deserialize)]
struct RepositoryFile {
    #[serde(default)]
    reference: Option<String>,
}

fn verify_pgbackrest(context: &Context, path: &Path) -> ValidationResult {
    let manifest_path = path.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return no_manifest(context);
    }

    let mut result = ValidationResult::default();
    let manifest = match KeyValueFile::load(&manifest_path) {
        Ok(manifest) => manifest,
        Err(error) => {
            result.error(format!("Cannot read {MANIFEST_FILE}: {error}"));
            return result;
        }
    };

    let Some(files) = manifest.section("target:file") else {
        result.warning(format!("{MANIFEST_FILE} lists no files"));
        return result;
    };

    for (name, value) in files.iter() {
        let entry: RepositoryFile = match serde_json::from_str(value) {
            Ok(entry) => entry,
            Err(error) => {
                result.error(format!("Invalid manifest entry for {name}: {error}"));
                continue;
            }
        };

        // Referenced files live in an earlier backup.
        if entry.reference.is_some() {
            continue;
        }

        if !repository_file_exists(path, name) {
            result.error(format!("Missing file: {name}"));
        }
    }

    result
}

fn repository_file_exists(backup: &Path, name: &str) -> bool {
    let relative = if name.starts_with("pg_data/") || name.starts_with("pg_tblspc/") {
        name.to_string()
    } else {
        format!("pg_data/{name}")
    };

    backup.join(&relative).is_file()
        || REPOSITORY_SUFFIXES
            .iter()
            .any(|suffix| backup.join(format!("{relative}{suffix}")).is_file())
}
