//! Timestamp utilities
//!
//! Timestamps are stored as RFC 3339 text and dates as `YYYY-MM-DD` text.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar date
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Format a timestamp for storage
pub fn to_db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a stored RFC 3339 timestamp
pub fn from_db_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", raw, e)))
}

/// Format a date for storage
pub fn to_db_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored `YYYY-MM-DD` date
pub fn from_db_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| Error::Internal(format!("Failed to parse date '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[tokio::test]
    async fn test_now_successive_calls_advance() {
        let time1 = now();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let time2 = now();
        assert!(time2 > time1);
    }

    #[test]
    fn test_timestamp_storage_format_is_reversible() {
        let ts = now();
        let stored = to_db_timestamp(&ts);
        assert_eq!(from_db_timestamp(&stored).unwrap(), ts);
    }

    #[test]
    fn test_date_storage_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(to_db_date(&date), "2026-03-09");
        assert_eq!(from_db_date("2026-03-09").unwrap(), date);
    }

    #[test]
    fn test_corrupt_values_are_internal_errors() {
        assert!(matches!(from_db_timestamp("yesterday"), Err(Error::Internal(_))));
        assert!(matches!(from_db_date("09/03/2026"), Err(Error::Internal(_))));
    }
}
