//! # common
//! Builders for on-disk backup fixtures.
//!

#![allow(dead_code)]

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use backup_auditor::{BackupKind, BackupRecord, BackupStatus, BackupTool};
use chrono::{TimeZone, Utc};
use shared::{Lsn, WalSegmentName};

pub const LABEL: &str = "START WAL LOCATION: 0/2000028 (file 000000010000000000000002)
CHECKPOINT LOCATION: 0/2000060
BACKUP METHOD: streamed
BACKUP FROM: primary
START TIME: 2024-01-08 10:05:30 UTC
LABEL: pg_basebackup base backup
START TIMELINE: 1
";

pub fn write(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// A plain-form base backup at `root/name`.
pub fn basebackup_plain(root: &Path, name: &str, label: &str) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(path.join("base/1")).unwrap();
    fs::create_dir_all(path.join("global")).unwrap();
    write(&path.join("backup_label"), label);
    write(&path.join("PG_VERSION"), "16\n");
    write(&path.join("base/1/1259"), vec![0_u8; 8192]);
    path
}

/// A tar-form base backup at `root/name` holding `base.tar` or `base.tar.gz`.
pub fn basebackup_tar(root: &Path, name: &str, gzip: bool, member_prefix: &str) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(&path).unwrap();

    let members: [(&str, &[u8]); 2] = [("backup_label", LABEL.as_bytes()), ("PG_VERSION", b"16\n")];

    if gzip {
        let file = File::create(path.join("base.tar.gz")).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        append_members(&mut builder, member_prefix, &members);
        builder.into_inner().unwrap().finish().unwrap();
    } else {
        let file = File::create(path.join("base.tar")).unwrap();
        let mut builder = tar::Builder::new(file);
        append_members(&mut builder, member_prefix, &members);
        builder.finish().unwrap();
    }

    path
}

fn append_members<W: std::io::Write>(
    builder: &mut tar::Builder<W>,
    prefix: &str,
    members: &[(&str, &[u8])],
) {
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(u64::try_from(data.len()).unwrap());
        header.set_mode(0o644);
        builder
            .append_data(&mut header, format!("{prefix}{name}"), *data)
            .unwrap();
    }
}

pub fn probackup_control(mode: &str, status: &str, parent: Option<&str>) -> String {
    let mut control = format!(
        "#Configuration
backup-mode = {mode}
stream = true
compress-alg = none
#Backup info
timelineid = 1
start-lsn = 0/2000028
stop-lsn = 0/2000138
start-time = '2024-01-08 10:05:30+00'
end-time = '2024-01-08 10:07:30+00'
data-bytes = 22288792
wal-bytes = 16777216
status = {status}
program-version = 2.5.12
server-version = 16
"
    );

    if let Some(parent) = parent {
        control.push_str(&format!("parent-backup-id = '{parent}'\n"));
    }

    control
}

/// A pg_probackup backup at `root/backups/instance/id`.
pub fn probackup_backup(root: &Path, instance: &str, id: &str, control: &str) -> PathBuf {
    let path = root.join("backups").join(instance).join(id);
    fs::create_dir_all(path.join("database/base/1")).unwrap();
    fs::create_dir_all(path.join("database/global")).unwrap();
    write(&path.join("backup.control"), control);
    write(&path.join("database/PG_VERSION"), "16\n");
    write(&path.join("database/backup_label"), LABEL);
    path
}

pub const CATALOG: &str = r#"[backrest]
backrest-format=5
backrest-version="2.50"

[backup:current]
20240108-100530F={"backup-label":"20240108-100530F","backup-type":"full","backup-timestamp-start":1704709530,"backup-timestamp-stop":1704709650,"backup-lsn-start":"0/2000028","backup-lsn-stop":"0/2000060","backup-size":12345678,"backup-repo-size":5678901}
20240109-143015I={"backup-label":"20240109-143015I","backup-type":"incr","backup-timestamp-start":1704810615,"backup-timestamp-stop":1704810715,"backup-lsn-start":"0/3000028","backup-lsn-stop":"0/3000128","backup-size":2345678,"backup-repo-size":1234567}
"#;

pub fn backrest_manifest(label: &str, kind: &str, version: &str) -> String {
    format!(
        "[backup]
backup-label={label}
backup-type={kind}

[backup:db]
db-version={version}

[target:file]
pg_data/PG_VERSION={{\"size\":3,\"timestamp\":1704709530}}
pg_data/global/pg_control={{\"size\":8192,\"timestamp\":1704709530}}
"
    )
}

/// A pgBackRest repository at `root/repo` with stanza `demo`.
pub fn pgbackrest_repo(root: &Path) -> PathBuf {
    let repo = root.join("repo");
    let stanza = repo.join("backup/demo");
    fs::create_dir_all(repo.join("archive/demo")).unwrap();

    write(&stanza.join("backup.info"), CATALOG);

    for (label, kind, version) in [
        ("20240108-100530F", "full", "17"),
        ("20240109-143015I", "incr", "16"),
    ] {
        let backup = stanza.join(label);
        write(
            &backup.join("backup.manifest"),
            backrest_manifest(label, kind, version),
        );
        write(&backup.join("pg_data/PG_VERSION.gz"), "gz");
        write(&backup.join("pg_data/global/pg_control"), vec![0_u8; 8192]);
    }

    repo
}

/// Empty segment files on `timeline`, log 0, for each of `seg_ids`.
pub fn wal_archive(directory: &Path, timeline: u32, seg_ids: impl IntoIterator<Item = u32>) {
    fs::create_dir_all(directory).unwrap();
    for seg_id in seg_ids {
        let name = WalSegmentName::new(timeline, 0, seg_id).to_string();
        write(&directory.join(name), "");
    }
}

/// A complete, consistent record.
pub fn record(id: &str, path: &Path) -> BackupRecord {
    let mut record = BackupRecord::new(BackupTool::PgBasebackup, id, path);
    record.kind = BackupKind::Full;
    record.status = BackupStatus::Ok;
    record.start_time = Utc.timestamp_opt(1_704_709_530, 0).single();
    record.end_time = Utc.timestamp_opt(1_704_709_650, 0).single();
    record.start_lsn = Lsn(0x0200_0028);
    record.stop_lsn = Lsn(0x0200_0060);
    record.timeline = 1;
    record.pg_version = 160_000;
    record
}
