//! Time-of-day strings (`HH:MM` or `HH:MM:SS`).

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use wareflow_core::{DomainError, DomainResult};

/// Parse a wall-clock time of day.
pub fn parse_time_of_day(raw: &str) -> DomainResult<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| DomainError::validation(format!("invalid time of day '{raw}', expected HH:MM or HH:MM:SS")))
}

/// Parse a time-of-day string as a duration since midnight (`"00:15"` is 15 minutes).
pub fn parse_duration(raw: &str) -> DomainResult<Duration> {
    let t = parse_time_of_day(raw)?;
    Ok(t.signed_duration_since(NaiveTime::MIN))
}

/// Anchor a time of day on a calendar date (UTC).
pub fn anchor(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}
