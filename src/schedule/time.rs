//! Timestamp conventions.
//!
//! The wire carries UTC as ISO-8601 without milliseconds and without an
//! offset suffix (`2024-01-01T09:00:00`). Everything the user sees or types
//! lives in one display timezone; conversion happens only here.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Output format for timestamps sent to the backend.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Local `HH:MM` label used by list search and agenda rows.
pub const CLOCK_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("{time} on {date} does not exist in {tz}")]
    NonexistentLocalTime {
        date: NaiveDate,
        time: NaiveTime,
        tz: Tz,
    },
    #[error("Hour out of range: {0}")]
    HourOutOfRange(u32),
}

/// Parse a backend timestamp.
///
/// Accepts the naive wire form (taken as UTC), fractional seconds, and
/// RFC 3339 with `Z` or an explicit offset. Returns `None` for anything else.
pub fn parse_wire(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a UTC instant for the backend (seconds precision, no offset).
pub fn format_wire(dt: DateTime<Utc>) -> String {
    dt.format(WIRE_FORMAT).to_string()
}

/// Convert a UTC instant to the display timezone.
pub fn to_local(dt: DateTime<Utc>, tz: Tz) -> DateTime<Tz> {
    dt.with_timezone(&tz)
}

/// Resolve a local wall-clock time in the display timezone to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times
/// skipped by a DST jump are rejected.
pub fn from_local(date: NaiveDate, time: NaiveTime, tz: Tz) -> Result<DateTime<Utc>, TimeError> {
    match tz.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(TimeError::NonexistentLocalTime { date, time, tz }),
    }
}

/// First instant of `date` in `tz`, as UTC.
///
/// When local midnight is skipped by a DST jump the day starts at the first
/// wall-clock minute that exists after the gap.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let mut local = date.and_time(NaiveTime::MIN);
    while local.date() == date {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => return dt.with_timezone(&Utc),
            LocalResult::None => local += TimeDelta::minutes(1),
        }
    }
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last whole second of `date` in `tz` (23:59:59 local, or the last second
/// before a gap that swallows it), as UTC.
pub fn end_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let last = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let mut local = date.and_time(last);
    while local.date() == date {
        match tz.from_local_datetime(&local) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(_, dt) => return dt.with_timezone(&Utc),
            LocalResult::None => local -= TimeDelta::minutes(1),
        }
    }
    date.and_time(last).and_utc()
}
