//! Reporting periods and fiscal-year boundaries.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::reports::ReportError;

/// An inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` when `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ReportError> {
        if end < start {
            return Err(ReportError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if `date` falls within the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of days covered, counting both ends.
    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The period of identical length ending the day before this one.
    ///
    /// `end' = start - 1 day`, `start' = end' - (end - start)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if the prior period falls outside the
    /// supported calendar.
    pub fn preceding(&self) -> Result<Self, ReportError> {
        let out_of_range = || ReportError::InvalidDateRange {
            start: self.start,
            end: self.end,
        };
        let end = self.start.pred_opt().ok_or_else(out_of_range)?;
        let start = end
            .checked_sub_signed(self.end - self.start)
            .ok_or_else(out_of_range)?;
        Ok(Self { start, end })
    }
}

/// Fiscal-year start, as a month and day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalCalendar {
    /// Month the fiscal year starts in (1-12).
    pub start_month: u32,
    /// Day of month the fiscal year starts on.
    pub start_day: u32,
}

impl Default for FiscalCalendar {
    fn default() -> Self {
        Self {
            start_month: 1,
            start_day: 1,
        }
    }
}

impl FiscalCalendar {
    /// Returns the start of the fiscal year containing `as_of`.
    ///
    /// Days that do not exist in a given year (29 February) fall back to
    /// the last day of that month.
    #[must_use]
    pub fn year_start_for(&self, as_of: NaiveDate) -> NaiveDate {
        let this_year = self.start_in(as_of.year());
        if this_year <= as_of {
            this_year
        } else {
            self.start_in(as_of.year() - 1)
        }
    }

    fn start_in(&self, year: i32) -> NaiveDate {
        let month = self.start_month.clamp(1, 12);
        (1..=self.start_day.clamp(1, 31))
            .rev()
            .find_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .unwrap_or(NaiveDate::MIN)
    }
}
