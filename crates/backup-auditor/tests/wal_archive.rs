//! Tests for WAL archive gap detection
//!

use std::path::PathBuf;

use backup_auditor::{WalArchive, WalGap};
use shared::WalSegmentName;

fn archive(segments: &[(u32, u32, u32)]) -> WalArchive {
    WalArchive::new(
        PathBuf::from("/wal"),
        segments
            .iter()
            .map(|&(timeline, log_id, seg_id)| WalSegmentName::new(timeline, log_id, seg_id))
            .collect(),
    )
}

#[test]
fn contiguous_archive_has_no_gaps() {
    assert!(archive(&[(1, 0, 1), (1, 0, 2), (1, 0, 3)]).gaps().is_empty());
}

#[test]
fn gaps_are_inclusive_ranges() {
    let wal = archive(&[(1, 0, 1), (1, 0, 3), (1, 0, 7)]);

    let gaps = wal.gaps();

    assert_eq!(
        gaps,
        vec![
            WalGap {
                start: WalSegmentName::new(1, 0, 2),
                end: WalSegmentName::new(1, 0, 2),
            },
            WalGap {
                start: WalSegmentName::new(1, 0, 4),
                end: WalSegmentName::new(1, 0, 6),
            },
        ]
    );
    assert_eq!(gaps.first().unwrap().segment_count(), 1);
    assert_eq!(gaps.last().unwrap().segment_count(), 3);
    assert_eq!(
        gaps.last().unwrap().to_string(),
        "000000010000000000000004 .. 000000010000000000000006"
    );
}

#[test]
fn gap_across_log_boundary() {
    let wal = archive(&[(1, 0, 0xFFFF_FFFE), (1, 1, 1)]);

    let gaps = wal.gaps();

    assert_eq!(
        gaps,
        vec![WalGap {
            start: WalSegmentName::new(1, 0, 0xFFFF_FFFF),
            end: WalSegmentName::new(1, 1, 0),
        }]
    );
    assert_eq!(gaps.first().unwrap().segment_count(), 2);
}

#[test]
fn timeline_switch_is_not_a_gap() {
    let wal = archive(&[(1, 0, 1), (2, 0, 5)]);

    assert!(wal.gaps().is_empty());
}

#[test]
fn duplicates_are_removed() {
    let wal = archive(&[(1, 0, 2), (1, 0, 1), (1, 0, 2)]);

    assert_eq!(wal.len(), 2);
    assert!(wal.contains(&WalSegmentName::new(1, 0, 1)));
    assert!(!wal.contains(&WalSegmentName::new(1, 0, 3)));
}
