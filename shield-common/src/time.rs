//! Timestamp helpers
//!
//! All wire and storage timestamps use `YYYY-MM-DD HH:MM:SS` in GMT+1,
//! matching the field devices' clock configuration.

use crate::{Error, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

/// Storage/wire timestamp format
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Offset of the deployment timezone (GMT+1)
fn deployment_offset() -> FixedOffset {
    // 3600 seconds is always a valid offset
    FixedOffset::east_opt(3600).unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset"))
}

/// Current time in the deployment timezone
pub fn now_local() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&deployment_offset())
}

/// Current time formatted for storage
pub fn now_str() -> String {
    now_local().format(TIMESTAMP_FORMAT).to_string()
}

/// Today's calendar date in the deployment timezone, as `YYYY-MM-DD`
pub fn today_str() -> String {
    now_local().format("%Y-%m-%d").to_string()
}

/// Parse a storage timestamp
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| Error::InvalidRequest(format!("invalid timestamp '{}': {}", value, e)))
}

/// Calendar date component of a storage timestamp, as `YYYY-MM-DD`
pub fn day_of(value: &str) -> Result<String> {
    Ok(parse_timestamp(value)?.date().format("%Y-%m-%d").to_string())
}

/// Parse the date component of a storage timestamp
pub fn date_of(value: &str) -> Result<NaiveDate> {
    Ok(parse_timestamp(value)?.date())
}

/// Default aggregation window: today 08:00 to 18:00 (exam hours)
pub fn default_window() -> (String, String) {
    let today = today_str();
    (format!("{} 08:00:00", today), format!("{} 18:00:00", today))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_timestamp() {
        let ts = parse_timestamp("2026-06-15 09:30:00").unwrap();
        assert_eq!(ts.format(TIMESTAMP_FORMAT).to_string(), "2026-06-15 09:30:00");
    }

    #[test]
    fn test_parse_invalid_timestamp() {
        assert!(parse_timestamp("15/06/2026 09:30").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_day_extraction() {
        assert_eq!(day_of("2026-06-15 23:59:59").unwrap(), "2026-06-15");
    }

    #[test]
    fn test_default_window_spans_exam_hours() {
        let (start, end) = default_window();
        assert!(start.ends_with("08:00:00"));
        assert!(end.ends_with("18:00:00"));
        assert_eq!(&start[..10], &end[..10]);
    }

    #[test]
    fn test_now_str_round_trips() {
        let now = now_str();
        assert!(parse_timestamp(&now).is_ok());
    }
}
