//! Timestamp parsing for feed payloads. Feeds disagree on formats; a value
//! we cannot parse yields absent, never an error.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Parse a timestamp string into UTC. Accepts RFC 3339 (with offset) and a
/// handful of naive shapes that the feeds emit, which are assumed UTC.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Parse epoch milliseconds (USGS event times).
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}
