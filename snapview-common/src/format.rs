//! Formatting utilities for displaying snapshot dates and ranges

use chrono::{DateTime, Local, Utc};

/// Format a snapshot date in local time, empty when the date is unknown
///
/// # Examples
/// ```
/// use snapview_common::format_date;
/// assert_eq!(format_date(None, "%c"), "");
/// ```
pub fn format_date(date: Option<DateTime<Utc>>, pattern: &str) -> String {
    match date {
        Some(date) => date.with_timezone(&Local).format(pattern).to_string(),
        None => String::new(),
    }
}

/// Convert the daemon's seconds since the epoch; zero or less means unknown
pub fn date_from_epoch(seconds: i64) -> Option<DateTime<Utc>> {
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0)
}

/// Label for a snapshot or a pre/post pair
///
/// # Examples
/// ```
/// use snapview_common::format_range;
/// assert_eq!(format_range(Some(3), 4), "3 - 4");
/// assert_eq!(format_range(None, 7), "7");
/// ```
pub fn format_range(pre: Option<u32>, num: u32) -> String {
    match pre {
        Some(pre) => format!("{pre} - {num}"),
        None => num.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_from_epoch() {
        assert_eq!(date_from_epoch(0), None);
        assert_eq!(date_from_epoch(-5), None);
        let date = date_from_epoch(1_700_000_000).unwrap();
        assert_eq!(date.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_format_date_uses_pattern() {
        let date = date_from_epoch(1_700_000_000);
        let text = format_date(date, "%Y");
        assert_eq!(text, "2023");
    }

    #[test]
    fn test_format_range() {
        assert_eq!(format_range(Some(10), 11), "10 - 11");
        assert_eq!(format_range(None, 0), "0");
    }
}
