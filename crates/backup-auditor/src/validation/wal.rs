//! WAL continuity between a backup's start and stop LSN.
//!

use shared::lsn_to_segment;
use tracing::{debug, info, warn};

use super::ValidationResult;
use crate::{context::Context, record::BackupRecord, wal_archive::WalArchive};

/// Longest range enumerated, 16 TiB of WAL at the default segment size.
/// Anything longer comes from a corrupt LSN.
pub const MAX_RANGE_SEGMENTS: u64 = 1 << 20;

/// Checks that every segment between the backup's start and stop LSN is
/// archived.
///
/// Each absent segment is one error. A record without LSNs yields a single
/// warning. When only one LSN is known only its segment is checked. An
/// unknown timeline is taken to be timeline 1. A range of
/// [`MAX_RANGE_SEGMENTS`] or more is not enumerated and gives one error.
pub fn check_wal_availability(
    record: &BackupRecord,
    wal: &WalArchive,
    segment_size: u64,
) -> ValidationResult {
    let context = Context::for_record(record, "WAL");
    let mut result = ValidationResult::default();

    let (start_lsn, stop_lsn) = match (record.start_lsn.is_valid(), record.stop_lsn.is_valid()) {
        (false, false) => {
            result.warning("Backup has no LSN information");
            return result;
        }
        (true, false) => (record.start_lsn, record.start_lsn),
        (false, true) => (record.stop_lsn, record.stop_lsn),
        (true, true) => (record.start_lsn, record.stop_lsn),
    };

    let timeline = if record.timeline == 0 {
        debug!("{context}Timeline unknown, assuming 1");
        1
    } else {
        record.timeline
    };

    let start = lsn_to_segment(start_lsn, timeline, segment_size);
    let stop = lsn_to_segment(stop_lsn, timeline, segment_size);
    debug!("{context}Checking {start} ({start_lsn}) to {stop} ({stop_lsn})");

    let span = stop.segment_number().saturating_sub(start.segment_number());
    if span >= MAX_RANGE_SEGMENTS {
        warn!("{context}WAL range {start} to {stop} spans {span} segments");
        result.error("WAL range check aborted: too many segments");
        return result;
    }

    let mut missing = 0_usize;
    let mut current = start;

    while (current.log_id, current.seg_id) <= (stop.log_id, stop.seg_id) {
        if !wal.contains(&current) {
            missing += 1;
            warn!("{context}Missing WAL segment: {current}");
            result.error(format!("Missing WAL segment: {current}"));
        }

        current = current.next();

        // `next` wraps at the very end of the address space.
        if current.segment_number() == 0 {
            break;
        }
    }

    if missing > 0 {
        warn!("{context}Missing {missing} WAL segments");
    } else {
        info!("{context}All required WAL segments are archived");
    }

    result
}
