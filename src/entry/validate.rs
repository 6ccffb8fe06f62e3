//! Field validators shared by mutations and query parsing.

use chrono::NaiveDate;

use super::EntryError;
use crate::bucket::{parse_date, DATE_FORMAT};

pub const MAX_WARD_LEN: usize = 40;
pub const MAX_HN_LEN: usize = 20;
pub const MAX_LABEL_LEN: usize = 120;
pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_DETAIL_LEN: usize = 1000;
pub const MAX_NAME_LEN: usize = 60;
pub const MAX_MESSAGE_LEN: usize = 500;
pub const MAX_COUNTER: i64 = 100_000;
pub const MAX_PROCEDURE_COUNT: i64 = 1_000;
pub const MAX_AO_BATCH: i64 = 100;

/// Trimmed optional text, empty when absent, capped at `max` characters.
pub fn text(value: Option<&str>, field: &str, max: usize) -> Result<String, EntryError> {
    let trimmed = value.unwrap_or("").trim();
    if trimmed.chars().count() > max {
        return Err(EntryError::Validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Like [`text`], but empty is rejected.
pub fn required_text(value: Option<&str>, field: &str, max: usize) -> Result<String, EntryError> {
    let value = text(value, field, max)?;
    if value.is_empty() {
        return Err(EntryError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

/// A required zero-padded `YYYY-MM-DD` date.
pub fn date(value: Option<&str>, field: &str) -> Result<NaiveDate, EntryError> {
    let raw = value.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(EntryError::Validation(format!("{field} is required")));
    }
    parse_date(raw).ok_or_else(|| {
        EntryError::Validation(format!("{field} must be a date in YYYY-MM-DD format"))
    })
}

/// Canonical text form of a required date.
pub fn date_text(value: Option<&str>, field: &str) -> Result<String, EntryError> {
    date(value, field).map(|d| d.format(DATE_FORMAT).to_string())
}

/// An optional date: absent or blank gives an empty string.
pub fn optional_date_text(value: Option<&str>, field: &str) -> Result<String, EntryError> {
    match value.map(str::trim) {
        None | Some("") => Ok(String::new()),
        Some(raw) => date_text(Some(raw), field),
    }
}

/// A required integer in `[min, max]`.
pub fn count(value: Option<i64>, field: &str, min: i64, max: i64) -> Result<i64, EntryError> {
    let value = value.ok_or_else(|| EntryError::Validation(format!("{field} is required")))?;
    if !(min..=max).contains(&value) {
        return Err(EntryError::Validation(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(value)
}

pub fn id(value: Option<i64>) -> Result<i64, EntryError> {
    match value {
        Some(id) if id > 0 => Ok(id),
        Some(_) => Err(EntryError::Validation("id must be a positive integer".into())),
        None => Err(EntryError::Validation("id is required".into())),
    }
}

/// Parse a closed-enum field, reporting the field name on failure.
pub fn one_of<T: std::str::FromStr>(value: Option<&str>, field: &str) -> Result<T, EntryError> {
    let raw = value.map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(EntryError::Validation(format!("{field} is required")));
    }
    raw.parse::<T>()
        .map_err(|_| EntryError::Validation(format!("{field} has an unsupported value: {raw}")))
}
