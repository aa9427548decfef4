//! Timestamp utilities
//!
//! All "today" questions are answered against a fixed UTC offset taken from
//! configuration, never the host time zone. Timestamps are persisted as
//! fixed-width RFC 3339 UTC text with millisecond precision so that string
//! comparison in SQL matches chronological order.

use crate::{Error, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Parse a UTC offset such as `+09:00`, `-05:30` or `Z`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| invalid_offset(value));
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => return Err(invalid_offset(value)),
    };

    let (hours, minutes) = rest.split_once(':').ok_or_else(|| invalid_offset(value))?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid_offset(value));
    }
    let hours: i32 = hours.parse().map_err(|_| invalid_offset(value))?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid_offset(value))?;
    if hours > 14 || minutes > 59 {
        return Err(invalid_offset(value));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(|| invalid_offset(value))
}

fn invalid_offset(value: &str) -> Error {
    Error::Config(format!("Invalid UTC offset '{}', expected +HH:MM", value))
}

/// Calendar date of `instant` in the given offset
pub fn local_date(instant: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    instant.with_timezone(offset).date_naive()
}

/// UTC instant of local midnight starting `date`
pub fn start_of_local_day(date: NaiveDate, offset: &FixedOffset) -> DateTime<Utc> {
    let local_midnight = date.and_time(NaiveTime::MIN);
    let utc = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc)
}

/// Half-open `[start, end)` UTC bounds of the local day containing `instant`
pub fn local_day_bounds(
    instant: DateTime<Utc>,
    offset: &FixedOffset,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = start_of_local_day(local_date(instant, offset), offset);
    (start, start + Duration::days(1))
}

/// Encode a timestamp for storage (`2026-01-02T03:04:05.678Z`)
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a stored timestamp
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidInput(format!("Invalid timestamp '{}': {}", value, e)))
}
