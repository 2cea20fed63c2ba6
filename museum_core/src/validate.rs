//! Input parsing and validation shared by the CLI and web front ends.

use crate::{Error, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| Error::Validation("Date must be in YYYY-MM-DD format".into()))
}

/// Parse an optional date field; blank means absent
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>> {
    match optional(value) {
        Some(s) => parse_date(&s).map(Some),
        None => Ok(None),
    }
}

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(Error::Validation("Invalid email format".into()))
    }
}

pub fn validate_rating(rating: i64) -> Result<u8> {
    if (1..=5).contains(&rating) {
        Ok(rating as u8)
    } else {
        Err(Error::Validation("Rating must be between 1 and 5".into()))
    }
}

/// Parse a price such as `12`, `12.5` or `12.50` into pence
pub fn parse_price(value: &str) -> Result<u64> {
    let value = value.trim();
    if value.starts_with('-') {
        return Err(Error::Validation("Price must be non-negative".into()));
    }
    let invalid = || Error::Validation(format!("Invalid price '{}'", value));

    let (pounds, pence) = match value.split_once('.') {
        Some((p, frac)) => (p, frac),
        None => (value, ""),
    };
    if pence.len() > 2
        || !pence.chars().all(|c| c.is_ascii_digit())
        || (pounds.is_empty() && pence.is_empty())
    {
        return Err(invalid());
    }

    let pounds: u64 = if pounds.is_empty() {
        0
    } else {
        pounds.parse().map_err(|_| invalid())?
    };
    let pence: u64 = match pence.len() {
        0 => 0,
        1 => pence.parse::<u64>().map_err(|_| invalid())? * 10,
        _ => pence.parse().map_err(|_| invalid())?,
    };

    pounds
        .checked_mul(100)
        .and_then(|p| p.checked_add(pence))
        .ok_or_else(invalid)
}

/// Require a non-blank value, returning it trimmed
pub fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(Error::Validation(format!("{} is required", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Trim an optional text field; blank becomes None
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
