//! Work-day classification and month windows.
//!
//! Weekdays are configured with ISO numbers (1 = Monday … 7 = Sunday).
//! A [`Calendar`] is built once from a [`SchedulingConfig`] and then answers
//! every date question the aggregation and layout code asks.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interval::Interval;
use crate::types::UserId;

/// Largest month span a window may cover.
pub const MAX_WINDOW_MONTHS: u32 = 24;

/// Errors raised while building calendars and windows.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalendarError {
    /// A weekday number outside 1..=7.
    #[error("weekday must be between 1 (Monday) and 7 (Sunday), got {value}")]
    InvalidWeekday { value: u8 },

    /// A workday length outside 0..=24 hours.
    #[error("workday length must be between 0 and 24 hours, got {value}")]
    InvalidWorkdayLength { value: f64 },

    /// A window span outside 1..=24 months.
    #[error("window must span 1 to {MAX_WINDOW_MONTHS} months, got {value}")]
    MonthsOutOfRange { value: u32 },

    /// Date arithmetic left the representable range.
    #[error("date out of range: {date} + {months} months")]
    DateOverflow { date: NaiveDate, months: u32 },
}

/// Scheduling configuration supplied by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Daily work-hours used when a user has no override.
    /// Default: 8.
    pub default_workday_length: f64,

    /// Per-user daily work-hours.
    #[serde(default)]
    pub workday_lengths: HashMap<UserId, f64>,

    /// First day of the week, 1 = Monday … 7 = Sunday.
    /// Default: 1.
    pub first_weekday: u8,

    /// Days that are never work days.
    /// Default: `[6, 7]`.
    pub non_working_weekdays: Vec<u8>,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_workday_length: 8.0,
            workday_lengths: HashMap::new(),
            first_weekday: 1,
            non_working_weekdays: vec![6, 7],
        }
    }
}

/// Validated calendar built from a [`SchedulingConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    first_weekday: Weekday,
    /// Indexed by `Weekday::num_days_from_monday`.
    non_working: [bool; 7],
    default_workday_length: f64,
    workday_lengths: HashMap<UserId, f64>,
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            first_weekday: Weekday::Mon,
            non_working: [false, false, false, false, false, true, true],
            default_workday_length: 8.0,
            workday_lengths: HashMap::new(),
        }
    }
}

/// Converts an ISO weekday number into a [`Weekday`].
pub const fn weekday_from_iso(value: u8) -> Result<Weekday, CalendarError> {
    match value {
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        7 => Ok(Weekday::Sun),
        _ => Err(CalendarError::InvalidWeekday { value }),
    }
}

fn check_workday_length(value: f64) -> Result<f64, CalendarError> {
    if value.is_nan() || !(0.0..=24.0).contains(&value) {
        return Err(CalendarError::InvalidWorkdayLength { value });
    }
    Ok(value)
}

impl Calendar {
    /// Builds a calendar, validating weekday numbers and workday lengths.
    pub fn from_config(config: &SchedulingConfig) -> Result<Self, CalendarError> {
        let first_weekday = weekday_from_iso(config.first_weekday)?;

        let mut non_working = [false; 7];
        for &value in &config.non_working_weekdays {
            let weekday = weekday_from_iso(value)?;
            non_working[weekday.num_days_from_monday() as usize] = true;
        }

        let default_workday_length = check_workday_length(config.default_workday_length)?;
        let workday_lengths = config
            .workday_lengths
            .iter()
            .map(|(user, &hours)| check_workday_length(hours).map(|hours| (*user, hours)))
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            first_weekday,
            non_working,
            default_workday_length,
            workday_lengths,
        })
    }

    pub const fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    pub const fn default_workday_length(&self) -> f64 {
        self.default_workday_length
    }

    /// Daily work-hours for `user`: the override if configured, else the default.
    pub fn workday_length_for(&self, user: UserId) -> f64 {
        self.workday_lengths
            .get(&user)
            .copied()
            .unwrap_or(self.default_workday_length)
    }

    /// True iff `date` does not fall on a configured non-working weekday.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        !self.non_working[date.weekday().num_days_from_monday() as usize]
    }

    /// Counts workdays in `[from, to]`; zero when `to < from`.
    pub fn working_days_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        Interval::new(from, to).map_or(0, |range| self.working_days_in(&range))
    }

    /// Counts workdays inside an interval.
    pub fn working_days_in(&self, range: &Interval) -> u32 {
        let count = range.days().filter(|date| self.is_workday(*date)).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Rounds `date` back to the configured first day of the week.
    pub fn beginning_of_week(&self, date: NaiveDate) -> NaiveDate {
        let current = date.weekday().num_days_from_monday();
        let first = self.first_weekday.num_days_from_monday();
        let back = (current + 7 - first) % 7;
        date - Duration::days(i64::from(back))
    }

    /// The visible range starting at `date_from` and spanning `months` calendar months.
    pub fn window_for(date_from: NaiveDate, months: u32) -> Result<MonthWindow, CalendarError> {
        MonthWindow::new(date_from, months)
    }
}

/// A visible date range `[date_from, date_from + months - 1 day]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthWindow {
    date_from: NaiveDate,
    months: u32,
    range: Interval,
}

impl MonthWindow {
    /// Builds a window; `months` must be within 1..=24.
    pub fn new(date_from: NaiveDate, months: u32) -> Result<Self, CalendarError> {
        if months == 0 || months > MAX_WINDOW_MONTHS {
            return Err(CalendarError::MonthsOutOfRange { value: months });
        }
        let overflow = CalendarError::DateOverflow {
            date: date_from,
            months,
        };
        let date_to = date_from
            .checked_add_months(Months::new(months))
            .and_then(|date| date.pred_opt())
            .ok_or_else(|| overflow.clone())?;
        let range = Interval::new(date_from, date_to).map_err(|_| overflow)?;
        Ok(Self {
            date_from,
            months,
            range,
        })
    }

    pub const fn date_from(&self) -> NaiveDate {
        self.date_from
    }

    pub const fn date_to(&self) -> NaiveDate {
        self.range.end()
    }

    pub const fn months(&self) -> u32 {
        self.months
    }

    pub const fn range(&self) -> Interval {
        self.range
    }

    /// Number of days in the window.
    pub fn len_days(&self) -> i64 {
        self.range.len_days()
    }

    /// The window `months` calendar months earlier.
    pub fn previous(&self) -> Result<Self, CalendarError> {
        let date_from = self
            .date_from
            .checked_sub_months(Months::new(self.months))
            .ok_or(CalendarError::DateOverflow {
                date: self.date_from,
                months: self.months,
            })?;
        Self::new(date_from, self.months)
    }

    /// The window `months` calendar months later.
    pub fn next(&self) -> Result<Self, CalendarError> {
        let date_from = self
            .date_from
            .checked_add_months(Months::new(self.months))
            .ok_or(CalendarError::DateOverflow {
                date: self.date_from,
                months: self.months,
            })?;
        Self::new(date_from, self.months)
    }
}
