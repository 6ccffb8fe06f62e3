//! Period bucketing for grouped queries.
//!
//! Every bucket key is zero-padded and date-prefixed, so sorting keys as
//! strings sorts them chronologically.

use chrono::{Datelike, NaiveDate};

use crate::models::Granularity;

/// Canonical on-disk date format.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Map a date to its bucket key.
///
/// - `day`   → `YYYY-MM-DD`
/// - `week`  → `YYYY-Www`, ISO-8601 (Monday first, year of the week's Thursday)
/// - `month` → `YYYY-MM`
/// - `year`  → `YYYY`
pub fn bucket_key(date: NaiveDate, granularity: Granularity) -> String {
    match granularity {
        Granularity::Day => date.format(DATE_FORMAT).to_string(),
        Granularity::Week => {
            let week = date.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        Granularity::Month => format!("{:04}-{:02}", date.year(), date.month()),
        Granularity::Year => format!("{:04}", date.year()),
    }
}

/// Parse a zero-padded `YYYY-MM-DD` value.
///
/// chrono accepts unpadded fields (`2024-6-1`); those are rejected here
/// because range filters compare dates as text.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Bucket key for a stored date string. `None` when the value is not a date.
pub fn bucket_key_str(value: &str, granularity: Granularity) -> Option<String> {
    parse_date(value).map(|d| bucket_key(d, granularity))
}
