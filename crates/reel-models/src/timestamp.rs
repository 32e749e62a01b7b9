//! Timestamp parsing utilities.
//!
//! Records are written with RFC 3339 timestamps. Tracker files produced by
//! older tooling carry naive ISO-8601 timestamps without an offset
//! (`2025-01-03T10:00:00.123456`); those are read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Naive layouts accepted after RFC 3339 fails.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Errors from timestamp parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Timestamp is empty")]
    Empty,

    #[error("Invalid timestamp format: '{0}'")]
    InvalidFormat(String),
}

/// Parse an RFC 3339 or naive ISO-8601 timestamp into UTC.
///
/// # Examples
/// ```
/// use reel_models::timestamp::parse_datetime;
/// let a = parse_datetime("2025-01-03T10:00:00Z").unwrap();
/// let b = parse_datetime("2025-01-03T10:00:00").unwrap();
/// assert_eq!(a, b);
/// ```
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::InvalidFormat(raw.to_string()))
}

/// Serde `deserialize_with` helper for required timestamps.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(&raw).map_err(serde::de::Error::custom)
}

/// Serde `deserialize_with` helper for optional timestamps.
///
/// `null` and empty strings both read as `None`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.filter(|s| !s.trim().is_empty())
        .map(|s| parse_datetime(&s))
        .transpose()
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_datetime("2025-03-01T12:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_legacy_naive_with_micros() {
        let dt = parse_datetime("2025-01-03T10:00:00.123456").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_parse_space_separated() {
        let dt = parse_datetime("2025-01-03 09:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 3, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_datetime("   "), Err(TimestampError::Empty));
        assert!(matches!(
            parse_datetime("next tuesday"),
            Err(TimestampError::InvalidFormat(_))
        ));
    }
}
