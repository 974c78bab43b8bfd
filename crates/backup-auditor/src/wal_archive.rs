//! The inventory of archived WAL segments.
//!

use core::fmt;
use std::path::{Path, PathBuf};

use shared::WalSegmentName;

/// The segments found in a WAL archive directory, sorted and unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalArchive {
    path: PathBuf,
    segments: Vec<WalSegmentName>,
}

/// A run of consecutive segments missing from the archive, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalGap {
    #[allow(missing_docs)]
    pub start: WalSegmentName,
    #[allow(missing_docs)]
    pub end: WalSegmentName,
}

impl WalGap {
    /// How many segments the gap spans.
    pub fn segment_count(&self) -> u64 {
        self.end
            .segment_number()
            .saturating_sub(self.start.segment_number())
            .saturating_add(1)
    }
}

impl fmt::Display for WalGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{} .. {}", self.start, self.end)
        }
    }
}

impl WalArchive {
    /// Sorts and de-duplicates `segments`.
    pub fn new(path: PathBuf, mut segments: Vec<WalSegmentName>) -> Self {
        segments.sort_unstable();
        segments.dedup();
        Self { path, segments }
    }

    /// The archive directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The segments in order.
    pub fn segments(&self) -> &[WalSegmentName] {
        &self.segments
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// If the archive holds `segment`.
    pub fn contains(&self, segment: &WalSegmentName) -> bool {
        self.segments.binary_search(segment).is_ok()
    }

    /// Holes between neighbouring segments of the same timeline.
    ///
    /// Only gaps between archived segments are reported; nothing is assumed
    /// about what precedes the first or follows the last segment.
    pub fn gaps(&self) -> Vec<WalGap> {
        self.segments
            .windows(2)
            .filter_map(|pair| match pair {
                [previous, next] if previous.timeline == next.timeline => {
                    let expected = previous.next();
                    (expected < *next).then(|| WalGap {
                        start: expected,
                        end: WalSegmentName::from_segment_number(
                            next.timeline,
                            next.segment_number().saturating_sub(1),
                        ),
                    })
                }
                _ => None,
            })
            .collect()
    }
}
