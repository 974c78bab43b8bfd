//! # Shared
//! Log sequence number algebra, WAL segment names, the key-value file reader
//! and logger setup used by the auditor.
//!

#![warn(missing_docs)]

mod key_value;
mod logger;
mod wal_segment;
mod xlog;

pub use key_value::{KeyValueError, KeyValueFile, Section};
pub use logger::{LoggerConfig, LoggerError, init_logger};
pub use wal_segment::WalSegmentName;
pub use xlog::{
    DEFAULT_WAL_SEGMENT_SIZE, Lsn, ParseLsnError, compare_lsn, lsn_to_segment, segment_start_lsn,
};
