//! Terminal styling and value formatting shared by the commands.
//!

use core::fmt::Display;

use chrono::{DateTime, Local, Utc};
use owo_colors::{OwoColorize, Style as Paint};

use crate::record::BackupStatus;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// The display time format.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether and how to color terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    /// Emit ANSI escapes.
    pub color: bool,
}

impl Style {
    #[allow(missing_docs)]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(self, text: impl Display, paint: Paint) -> String {
        if self.color {
            text.style(paint).to_string()
        } else {
            text.to_string()
        }
    }

    #[allow(missing_docs)]
    pub fn bold(self, text: impl Display) -> String {
        self.paint(text, Paint::new().bold())
    }

    #[allow(missing_docs)]
    pub fn ok(self, text: impl Display) -> String {
        self.paint(text, Paint::new().green())
    }

    #[allow(missing_docs)]
    pub fn error(self, text: impl Display) -> String {
        self.paint(text, Paint::new().red())
    }

    #[allow(missing_docs)]
    pub fn warning(self, text: impl Display) -> String {
        self.paint(text, Paint::new().yellow())
    }

    #[allow(missing_docs)]
    pub fn note(self, text: impl Display) -> String {
        self.paint(text, Paint::new().cyan())
    }

    /// `status` padded to `width` then colored by severity.
    pub fn status(self, status: BackupStatus, width: usize) -> String {
        let text = format!("{:<width$}", status.as_str());
        match status {
            BackupStatus::Ok => self.ok(text),
            BackupStatus::Error | BackupStatus::Corrupt => self.error(text),
            BackupStatus::Warning | BackupStatus::Orphan => self.warning(text),
            BackupStatus::Running => self.note(text),
        }
    }
}

/// `value / unit` with two decimals, rounded half up.
fn two_decimals(value: u64, unit: u64) -> String {
    let unit = u128::from(unit.max(1));
    let hundredths = (u128::from(value) * 100 + unit / 2) / unit;
    format!("{}.{:02}", hundredths / 100, hundredths % 100)
}

/// MB below a GiB, GB above. `None` for zero.
pub fn format_size(bytes: u64) -> Option<String> {
    match bytes {
        0 => None,
        bytes if bytes > GIB => Some(format!("{} GB", two_decimals(bytes, GIB))),
        bytes => Some(format!("{} MB", two_decimals(bytes, MIB))),
    }
}

/// Like [`format_size`] with a TB step, `N/A` for zero.
pub fn format_total_size(bytes: u64) -> String {
    match bytes {
        0 => "N/A".to_string(),
        bytes if bytes > TIB => format!("{} TB", two_decimals(bytes, TIB)),
        bytes => format_size(bytes).unwrap_or_default(),
    }
}

/// Local time, or `N/A`.
pub fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || "N/A".to_string(),
        |time| time.with_timezone(&Local).format(TIME_FORMAT).to_string(),
    )
}

/// `Xh Ym Zs`, dropping leading zero units.
pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let seconds = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `major.minor` from `major * 10000 + minor`, or `N/A`.
pub fn format_pg_version(version: u32) -> String {
    if version == 0 {
        "N/A".to_string()
    } else {
        format!("{}.{}", version / 10000, version % 10000)
    }
}
