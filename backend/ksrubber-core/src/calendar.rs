// src/calendar.rs

use chrono::{Datelike, Local, NaiveDate, Weekday};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::die_catalog::DieCatalog;
use crate::ksrubber_data::DailyProductionRecord;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid month {month} for year {year}")]
    InvalidMonth { year: i32, month: u32 },
    #[error("Invalid period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),
}

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, CalendarError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Self { year, month })
            .ok_or(CalendarError::InvalidMonth { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// Parses `YYYY-MM`.
    pub fn parse(raw: &str) -> Result<Self, CalendarError> {
        let invalid = || CalendarError::InvalidPeriod(raw.to_string());
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month)
    }

    /// A month wins over a bare year; a bare year means January of that year;
    /// with neither, the month containing `today`.
    pub fn select(
        month: Option<&str>,
        year: Option<i32>,
        today: NaiveDate,
    ) -> Result<Self, CalendarError> {
        match (month.filter(|m| !m.trim().is_empty()), year) {
            (Some(month), _) => Self::parse(month),
            (None, Some(year)) => Self::new(year, 1),
            (None, None) => Ok(Self::containing(today)),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|first_of_next| first_of_next.pred_opt())
            .unwrap_or_else(|| self.first_day())
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One day of a synthesized month. Built fresh from the record set on every
/// render and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarDay {
    Recorded {
        date: NaiveDate,
        record: DailyProductionRecord,
    },
    Missing {
        date: NaiveDate,
    },
}

impl CalendarDay {
    pub fn date(&self) -> NaiveDate {
        match self {
            CalendarDay::Recorded { date, .. } | CalendarDay::Missing { date } => *date,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CalendarDay::Missing { .. })
    }

    pub fn record(&self) -> Option<&DailyProductionRecord> {
        match self {
            CalendarDay::Recorded { record, .. } => Some(record),
            CalendarDay::Missing { .. } => None,
        }
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Expands `period` into one entry per calendar day, in ascending order.
///
/// Days are matched to records by exact `YYYY-MM-DD` date string; when the
/// backend holds two records for the same date the later one wins. For the
/// month containing `today`, days after `today` are dropped.
pub fn synthesize(
    period: MonthPeriod,
    today: NaiveDate,
    records: &[DailyProductionRecord],
) -> Vec<CalendarDay> {
    let by_date: HashMap<&str, &DailyProductionRecord> = records
        .iter()
        .map(|record| (record.date.as_str(), record))
        .collect();

    let last_day = if period.contains(today) {
        today
    } else {
        period.last_day()
    };

    period
        .first_day()
        .iter_days()
        .take_while(|date| *date <= last_day)
        .map(|date| match by_date.get(date_key(date).as_str()) {
            Some(record) => CalendarDay::Recorded {
                date,
                record: (*record).clone(),
            },
            None => CalendarDay::Missing { date },
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    NoData { sunday: bool },
    Leave,
    Production { holiday: bool, sunday: bool },
}

impl DayStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DayStatus::NoData { .. } => "No data entered",
            DayStatus::Leave => "Leave",
            DayStatus::Production { holiday: true, .. } => "Holiday",
            DayStatus::Production { sunday: true, .. } => "Sunday",
            DayStatus::Production { .. } => "",
        }
    }
}

pub fn is_sunday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sun
}

/// `marked_leave` holds days marked as leave in this session that the record
/// list may not reflect yet.
pub fn classify(
    day: &CalendarDay,
    catalog: &DieCatalog,
    marked_leave: &HashSet<NaiveDate>,
) -> DayStatus {
    match day {
        CalendarDay::Missing { date } if marked_leave.contains(date) => DayStatus::Leave,
        CalendarDay::Missing { date } => DayStatus::NoData {
            sunday: is_sunday(*date),
        },
        CalendarDay::Recorded { record, .. } if catalog.is_leave_record(record) => DayStatus::Leave,
        CalendarDay::Recorded { date, record } => DayStatus::Production {
            holiday: record.is_holiday(),
            sunday: is_sunday(*date),
        },
    }
}
