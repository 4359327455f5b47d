//! Calendar values that drive discovery: single days, months, and year ranges.
//!
//! All day arithmetic goes through `chrono`, so leap years and month lengths
//! follow the proleptic Gregorian calendar.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// First season the archive carries pitch-by-pitch inning logs for.
pub const FIRST_ARCHIVE_YEAR: i32 = 2007;

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// A validated `(year, month, day)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarDay {
    year: i32,
    month: u32,
    day: u32,
}

impl CalendarDay {
    /// Build a day, rejecting anything outside the month's legal range.
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self, CoreError> {
        check_year(year)?;
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::from)
            .ok_or_else(|| CoreError::invalid_date(format!("{year:04}-{month:02}-{day:02}")))
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// The month this day belongs to.
    pub fn month_spec(&self) -> MonthSpec {
        MonthSpec {
            year: self.year,
            month: self.month,
        }
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl std::fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl std::str::FromStr for CalendarDay {
    type Err = CoreError;

    /// Parse an ISO 8601 date (`YYYY-MM-DD`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| CoreError::invalid_date(s))?;
        check_year(date.year())?;
        Ok(Self::from(date))
    }
}

/// A validated `(year, month)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthSpec {
    year: i32,
    month: u32,
}

impl MonthSpec {
    pub fn new(year: i32, month: u32) -> Result<Self, CoreError> {
        check_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(CoreError::invalid_month(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Number of days in this month.
    pub fn day_count(&self) -> u32 {
        let first = self.first_day();
        let next = if self.month == 12 {
            NaiveDate::from_ymd_opt(self.year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.year, self.month + 1, 1)
        };
        match (first, next) {
            (Some(first), Some(next)) => (next - first).num_days() as u32,
            // December of the last representable year
            _ => 31,
        }
    }

    /// Every day of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = CalendarDay> + use<> {
        let (year, month) = (self.year, self.month);
        (1..=self.day_count()).map(move |day| CalendarDay { year, month, day })
    }

    fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl std::fmt::Display for MonthSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for MonthSpec {
    type Err = CoreError;

    /// Parse an ISO 8601 month (`YYYY-MM`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| CoreError::invalid_month(s))?;
        let year: i32 = year.parse().map_err(|_| CoreError::invalid_month(s))?;
        let month: u32 = month.parse().map_err(|_| CoreError::invalid_month(s))?;
        Self::new(year, month)
    }
}

/// The twelve months of `year`, January first.
pub fn months_of_year(year: i32) -> Result<Vec<MonthSpec>, CoreError> {
    (1..=12).map(|month| MonthSpec::new(year, month)).collect()
}

/// Seasons to harvest: `start..=end`, empty when `start > end`.
pub fn year_range(start: i32, end: i32) -> Result<Vec<i32>, CoreError> {
    check_year(start)?;
    check_year(end)?;
    Ok((start..=end).collect())
}

fn check_year(year: i32) -> Result<(), CoreError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(CoreError::invalid_year(year.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/calendar_tests.rs"]
mod tests;
