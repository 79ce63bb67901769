//! age.rs
//!
//! Calendar-aware age calculation: the elapsed "X years, Y months, Z days",
//! whole-unit totals, and the countdown to the next birthday.
//!
//! Chrono does not provide a built-in year/month/day diff (unlike Python’s
//! relativedelta). We count whole calendar months by stepping the birth
//! instant forward with `checked_add_months`, which clamps the day to the end
//! of shorter months, and take the remaining whole days from that anchor.
//!
//! This logic correctly handles:
//!   • a birth on the 31st rolling into 30-day months and February
//!   • leap years and 29 February birthdays
//!   • a time-of-day later than the reference time (the day is not complete)

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Elapsed time since a birth date, as shown by the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeResult {
    pub years: u32,
    pub months: u32,
    pub days: u32,
    pub total_months: u32,
    pub total_weeks: u64,
    pub total_days: u64,
    pub total_hours: u64,
    pub next_birthday: NextBirthday,
}

/// Countdown to the next anniversary of the birth date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextBirthday {
    pub months: u32,
    pub days: u32,
    pub day_of_week: String,
    pub date: NaiveDate,
}

impl NextBirthday {
    pub fn is_today(&self) -> bool {
        self.months == 0 && self.days == 0
    }
}

impl AgeResult {
    /// Returns a human age as a string, e.g. "24 years, 5 months, 1 day"
    pub fn summary(&self) -> String {
        format!(
            "{} year{}, {} month{}, {} day{}",
            self.years,
            plural(self.years),
            self.months,
            plural(self.months),
            self.days,
            plural(self.days)
        )
    }
}

/// Computes the age breakdown of `birth` as of `now`.
///
/// The caller guarantees `birth <= now` (see `validate::parse_birth_date`);
/// nothing here re-checks it.
pub fn compute_age(birth: NaiveDateTime, now: NaiveDateTime) -> AgeResult {
    let (total_months, days) = calendar_diff(birth, now);

    let elapsed = now.signed_duration_since(birth);
    let total_days = u64::try_from(elapsed.num_days()).unwrap_or(0);
    let total_hours = u64::try_from(elapsed.num_hours()).unwrap_or(0);

    AgeResult {
        years: total_months / 12,
        months: total_months % 12,
        days,
        total_months,
        total_weeks: total_days / 7,
        total_days,
        total_hours,
        next_birthday: next_birthday(birth.date(), now.date()),
    }
}

/// Whole calendar months from `from` to `to`, plus the whole days left over.
fn calendar_diff(from: NaiveDateTime, to: NaiveDateTime) -> (u32, u32) {
    let year_span = to.year() - from.year();
    let month_span = to.month() as i32 - from.month() as i32;

    // Field difference overshoots by at most one month (day or time not reached yet).
    let mut months = u32::try_from(year_span * 12 + month_span).unwrap_or(0);
    let anchor = loop {
        match from.checked_add_months(Months::new(months)) {
            Some(anchor) if anchor <= to => break anchor,
            _ if months == 0 => break from,
            _ => months -= 1,
        }
    };

    let days = u32::try_from(to.signed_duration_since(anchor).num_days()).unwrap_or(0);
    (months, days)
}

fn next_birthday(birth: NaiveDate, today: NaiveDate) -> NextBirthday {
    let date = match observed_anniversary(birth, today.year()) {
        Some(date) if date >= today => date,
        // Falls back to today only at the edge of chrono's supported year range.
        _ => observed_anniversary(birth, today.year() + 1).unwrap_or(today),
    };

    let (months, days) = calendar_diff(
        today.and_time(NaiveTime::MIN),
        date.and_time(NaiveTime::MIN),
    );

    NextBirthday {
        months,
        days,
        day_of_week: date.format("%A").to_string(),
        date,
    }
}

/// The anniversary of `birth` in `year`; 29 February is observed on the 28th
/// in common years.
fn observed_anniversary(birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    birth.with_year(year).or_else(|| {
        let leap_day = birth.month() == 2 && birth.day() == 29;
        leap_day.then(|| NaiveDate::from_ymd_opt(year, 2, 28)).flatten()
    })
}

fn plural(n: u32) -> &'static str {
    if n == 1 { "" } else { "s" }
}
