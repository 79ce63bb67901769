//! Birth-date pre-check run before the calculator.
//!
//! `age::compute_age` trusts its input, so everything that could make a
//! birth date unusable is rejected here.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidBirthDate {
    #[error("Please enter your date of birth.")]
    Missing,
    #[error("Please enter a valid date in the past.")]
    Malformed { input: String },
    #[error("Please enter a valid date in the past.")]
    InFuture { date: NaiveDateTime },
}

/// Parses `input` as a real calendar date (optionally with a time of day)
/// that is not after `now`.
pub fn parse_birth_date(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime, InvalidBirthDate> {
    let input = input.trim();
    if input.is_empty() {
        return Err(InvalidBirthDate::Missing);
    }

    let date = parse_date_time(input).ok_or_else(|| InvalidBirthDate::Malformed {
        input: input.to_string(),
    })?;

    if date > now {
        return Err(InvalidBirthDate::InFuture { date });
    }

    Ok(date)
}

/// Parses the accepted date and date-time syntaxes; a bare date means midnight.
pub fn parse_date_time(input: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
}
