//! Text encoding for persisted timestamps
//!
//! Timestamps are written as RFC 3339 UTC with nanosecond precision, which is
//! lossless and sorts lexicographically in time order. Rows written by older
//! clients may hold an offset-less ISO date-time; those are read as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Encode a timestamp for storage
pub fn encode(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Decode a stored timestamp, or `None` if it is not a recognized form
pub fn decode(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .map(|naive| naive.and_utc())
}
