//! Log sequence numbers and their mapping onto WAL segments.
//!

use core::{cmp::Ordering, fmt, num::ParseIntError, str::FromStr};

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::WalSegmentName;

/// The WAL segment size used when none is configured, 16 MiB.
pub const DEFAULT_WAL_SEGMENT_SIZE: u64 = 0x100_0000;

/// A 64-bit position in the write-ahead log stream.
///
/// Zero is used throughout as "unknown".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsn(pub u64);

impl Lsn {
    /// The unknown position.
    pub const INVALID: Self = Self(0);

    /// Builds an LSN from its upper and lower halves.
    pub fn from_parts(high: u32, low: u32) -> Self {
        Self((u64::from(high) << 32) | u64::from(low))
    }

    /// The upper 32 bits.
    pub fn high(self) -> u32 {
        u32::try_from(self.0 >> 32).unwrap_or(u32::MAX)
    }

    /// The lower 32 bits.
    pub fn low(self) -> u32 {
        u32::try_from(self.0 & 0xFFFF_FFFF).unwrap_or(u32::MAX)
    }

    /// If this LSN carries a position.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.high(), self.low())
    }
}

impl FromStr for Lsn {
    type Err = ParseLsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (high, low) = s.split_once('/').ok_or(ParseLsnError::MissingSeparator)?;

        let high = parse_half(high)?;
        let low = parse_half(low)?;

        Ok(Self::from_parts(high, low))
    }
}

impl Serialize for Lsn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_half(half: &str) -> Result<u32, ParseLsnError> {
    if half.is_empty() {
        return Err(ParseLsnError::EmptyHalf);
    }

    if let Some(character) = half.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(ParseLsnError::InvalidCharacter(character));
    }

    u32::from_str_radix(half, 16).map_err(ParseLsnError::TooWide)
}

/// Compares two LSNs, returning -1, 0 or 1.
pub fn compare_lsn(a: Lsn, b: Lsn) -> i32 {
    match a.cmp(&b) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// Maps an LSN onto the segment that contains it.
///
/// A `segment_size` of zero selects [`DEFAULT_WAL_SEGMENT_SIZE`]. The segment
/// number is split into a 32-bit log id and a 32-bit segment id.
pub fn lsn_to_segment(lsn: Lsn, timeline: u32, segment_size: u64) -> WalSegmentName {
    let segment_size = effective_segment_size(segment_size);
    WalSegmentName::from_segment_number(timeline, lsn.0 / segment_size)
}

/// The first LSN inside `segment`.
pub fn segment_start_lsn(segment: WalSegmentName, segment_size: u64) -> Lsn {
    let segment_size = effective_segment_size(segment_size);
    Lsn(segment.segment_number().saturating_mul(segment_size))
}

fn effective_segment_size(segment_size: u64) -> u64 {
    if segment_size == 0 {
        DEFAULT_WAL_SEGMENT_SIZE
    } else {
        segment_size
    }
}

#[allow(missing_docs)]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseLsnError {
    #[error("LSN is missing the '/' separator")]
    MissingSeparator,

    #[error("LSN has an empty half")]
    EmptyHalf,

    #[error("LSN contains the non-hex character '{0}'")]
    InvalidCharacter(char),

    #[error("LSN half does not fit in 32 bits: {0}")]
    TooWide(#[source] ParseIntError),
}
