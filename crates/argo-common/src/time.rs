//! Timestamp rendering and parsing.
//!
//! Every timestamp leaving the core is UTC and rendered with
//! [`format_timestamp`]; [`parse_timestamp`] reads those back as well as the
//! looser forms found in CSV exports and database dumps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Render a timestamp as RFC 3339 in UTC, e.g. `2025-08-03T06:12:00Z`.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a timestamp string.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` or
/// `YYYY-MM-DD HH:MM:SS[.f]` (assumed UTC), and bare dates.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_format_timestamp() {
        let dt = Utc.with_ymd_and_hms(2025, 8, 3, 6, 12, 0).unwrap();
        assert_eq!(format_timestamp(&dt), "2025-08-03T06:12:00Z");
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2024-01-15T12:00:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 12);
    }

    #[test]
    fn test_parse_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 8, 3, 6, 12, 30).unwrap();
        assert_eq!(parse_timestamp("2025-08-03T06:12:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-08-03 06:12:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-08-03 06:12:30.000").unwrap(), expected);
    }

    #[test]
    fn test_parse_date_only() {
        let dt = parse_timestamp("2025-08-03").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 8, 3, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_round_trip_with_fraction() {
        let dt = Utc.with_ymd_and_hms(2025, 8, 3, 6, 12, 30).unwrap()
            + chrono::Duration::milliseconds(250);
        assert_eq!(parse_timestamp(&format_timestamp(&dt)).unwrap(), dt);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("not a time").is_err());
        assert!(parse_timestamp("").is_err());
    }
}
