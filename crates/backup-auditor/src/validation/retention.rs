//! Retention policy across the whole inventory.
//!

use chrono::{DateTime, TimeDelta, Utc};

use super::ValidationResult;
use crate::record::{BackupRecord, BackupStatus};

/// How many recent backups must exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// An OK backup must have started within this many days. Zero disables.
    pub days: u32,

    /// Each of this many trailing 7-day windows must hold an OK backup. Zero
    /// disables.
    pub weekly: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self { days: 7, weekly: 4 }
    }
}

/// Checks the inventory against `policy` as of `now`.
///
/// Only OK backups count. A backup is placed at its start time, or its end
/// time when the start is unknown.
pub fn check_retention_policy(
    records: &[BackupRecord],
    now: DateTime<Utc>,
    policy: &RetentionPolicy,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    let times: Vec<DateTime<Utc>> = records
        .iter()
        .filter(|record| record.status == BackupStatus::Ok)
        .filter_map(|record| record.start_time.or(record.end_time))
        .collect();

    if policy.days > 0 {
        let cutoff = before(now, TimeDelta::try_days(i64::from(policy.days)));
        if !times.iter().any(|time| *time >= cutoff && *time <= now) {
            result.error(format!(
                "No successful backup in the last {} day(s)",
                policy.days
            ));
        }
    }

    if policy.weekly > 0 {
        let covered = covered_weeks(&times, now, policy.weekly);
        if covered < policy.weekly {
            result.warning(format!(
                "Only {covered} of the last {} week(s) have a successful backup",
                policy.weekly
            ));
        }
    }

    result
}

/// How many of the `weekly` trailing 7-day windows hold one of `times`.
///
/// Windows older than the oldest backup cannot be covered, so the count stops
/// there.
fn covered_weeks(times: &[DateTime<Utc>], now: DateTime<Utc>, weekly: u32) -> u32 {
    let Some(oldest) = times.iter().min().copied() else {
        return 0;
    };

    let mut covered = 0;
    for week in 0..weekly {
        let end = before(now, TimeDelta::try_weeks(i64::from(week)));
        if end < oldest {
            break;
        }

        let start = before(end, TimeDelta::try_weeks(1));
        if times.iter().any(|time| *time > start && *time <= end) {
            covered += 1;
        }

        if start == DateTime::<Utc>::MIN_UTC {
            break;
        }
    }

    covered
}

/// `time - delta`, clamped to the earliest representable time.
fn before(time: DateTime<Utc>, delta: Option<TimeDelta>) -> DateTime<Utc> {
    delta
        .and_then(|delta| time.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
