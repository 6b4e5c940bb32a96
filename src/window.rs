// Inclusive calendar-day window used to scope availability queries

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};

// Wire date format (YYYY-MM-DD)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    // Window starting at `start` and reaching `days_ahead` days into the future.
    // None when the end falls past the last representable date.
    pub fn starting_at(start: NaiveDate, days_ahead: u32) -> Option<Self> {
        let end = start.checked_add_days(Days::new(u64::from(days_ahead)))?;
        Some(Self { start, end })
    }

    // Today (local time) plus `days_ahead`, the range a date picker offers
    pub fn from_today(days_ahead: u32) -> Option<Self> {
        Self::starting_at(Local::now().date_naive(), days_ahead)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    // Every calendar day in the window, both ends included
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn start_param(&self) -> String {
        format_date(self.start)
    }

    pub fn end_param(&self) -> String {
        format_date(self.end)
    }
}
