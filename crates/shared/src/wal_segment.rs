//! WAL segment file names and their ordering.
//!

use core::fmt;

/// A WAL segment file name, `TTTTTTTTLLLLLLLLSSSSSSSS` in hex.
///
/// Ordering is by timeline, then log id, then segment id, which matches the
/// lexical ordering of the file names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WalSegmentName {
    /// The timeline the segment belongs to.
    pub timeline: u32,

    /// The upper 32 bits of the segment number.
    pub log_id: u32,

    /// The lower 32 bits of the segment number.
    pub seg_id: u32,
}

impl WalSegmentName {
    /// The length of a segment file name.
    pub const FILE_NAME_LENGTH: usize = 24;

    /// Creates a segment name.
    pub fn new(timeline: u32, log_id: u32, seg_id: u32) -> Self {
        Self {
            timeline,
            log_id,
            seg_id,
        }
    }

    /// Splits a 64-bit segment number into log and segment ids.
    pub fn from_segment_number(timeline: u32, segment_number: u64) -> Self {
        Self {
            timeline,
            log_id: u32::try_from(segment_number >> 32).unwrap_or(u32::MAX),
            seg_id: u32::try_from(segment_number & 0xFFFF_FFFF).unwrap_or(u32::MAX),
        }
    }

    /// Parses a segment file name.
    ///
    /// Returns `None` for anything that is not exactly 24 hex characters, such
    /// as `.history` or `.partial` files. Callers use this as a filter.
    pub fn parse_file_name(name: &str) -> Option<Self> {
        if name.len() != Self::FILE_NAME_LENGTH || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let timeline = u32::from_str_radix(name.get(0..8)?, 16).ok()?;
        let log_id = u32::from_str_radix(name.get(8..16)?, 16).ok()?;
        let seg_id = u32::from_str_radix(name.get(16..24)?, 16).ok()?;

        Some(Self::new(timeline, log_id, seg_id))
    }

    /// The 64-bit segment number, log id in the upper half.
    pub fn segment_number(&self) -> u64 {
        (u64::from(self.log_id) << 32) | u64::from(self.seg_id)
    }

    /// The following segment on the same timeline.
    ///
    /// The segment id wraps into the log id.
    #[must_use]
    pub fn next(&self) -> Self {
        let (seg_id, wrapped) = self.seg_id.overflowing_add(1);
        let log_id = if wrapped {
            self.log_id.wrapping_add(1)
        } else {
            self.log_id
        };

        Self {
            timeline: self.timeline,
            log_id,
            seg_id,
        }
    }
}

impl fmt::Display for WalSegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}{:08X}{:08X}",
            self.timeline, self.log_id, self.seg_id
        )
    }
}
