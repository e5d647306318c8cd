//! Calendar feature derivation from a single date

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Calendar features derived deterministically from one date.
///
/// The same derivation runs over each historical record's date during batch
/// preprocessing and over "today" at prediction time, so the two executions
/// cannot disagree on how a date becomes features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarFeatures {
    /// Day of the month (1-31)
    pub day: u32,
    /// Month (1-12)
    pub month: u32,
    /// Calendar year
    pub year: i32,
    /// Day of the week, zero-indexed from Monday
    pub day_of_week: u32,
    /// ISO 8601 week number (weeks start Monday, week 1 contains the
    /// year's first Thursday)
    pub week_of_year: u32,
    /// True on Saturday and Sunday
    pub is_weekend: bool,
    /// True on the first day of the month
    pub is_month_start: bool,
    /// True on the last day of the month
    pub is_month_end: bool,
}

impl CalendarFeatures {
    /// Derive the calendar features for a date.
    pub fn for_date(date: NaiveDate) -> Self {
        let day_of_week = date.weekday().num_days_from_monday();

        Self {
            day: date.day(),
            month: date.month(),
            year: date.year(),
            day_of_week,
            week_of_year: date.iso_week().week(),
            is_weekend: day_of_week >= 5,
            is_month_start: date.day() == 1,
            is_month_end: date.day() == days_in_month(date.year(), date.month()),
        }
    }
}

/// Number of days in a calendar month, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}
