// ABOUTME: Weekly recurring availability and off-day window models
// ABOUTME: WeekDay, DaySchedule, WeeklySchedule, OffDays, and the off-day classifier input
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Fixed weekday key for the weekly schedule map
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WeekDay {
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
    /// Sunday
    Sunday,
}

impl WeekDay {
    /// All seven days in calendar order
    pub const ALL: [Self; 7] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
        Self::Sunday,
    ];

    /// Convert to string for storage keys
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Weekday of a calendar date
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

impl Display for WeekDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeekDay {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monday" => Ok(Self::Monday),
            "tuesday" => Ok(Self::Tuesday),
            "wednesday" => Ok(Self::Wednesday),
            "thursday" => Ok(Self::Thursday),
            "friday" => Ok(Self::Friday),
            "saturday" => Ok(Self::Saturday),
            "sunday" => Ok(Self::Sunday),
            other => Err(AppError::bad_request(format!("unknown weekday: {other}"))),
        }
    }
}

/// One fully-defined day of a weekly schedule
///
/// Invariant: either `off` is true and every time field is `None`, or `off`
/// is false and every time field is populated. `normalize_weekly_schedule`
/// never produces a partial day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// Working-day start, e.g. `"10:00 am"`
    pub start_time: Option<String>,
    /// Working-day end
    pub end_time: Option<String>,
    /// Start as minutes past midnight
    pub start_minute: Option<u16>,
    /// End as minutes past midnight
    pub end_minute: Option<u16>,
    /// Whether the artist takes this day off every week
    pub off: bool,
}

impl DaySchedule {
    /// A fully-off day
    #[must_use]
    pub const fn fully_off() -> Self {
        Self {
            start_time: None,
            end_time: None,
            start_minute: None,
            end_minute: None,
            off: true,
        }
    }

    /// Whether every field of the day is consistently populated
    #[must_use]
    pub const fn is_fully_defined(&self) -> bool {
        if self.off {
            self.start_time.is_none()
                && self.end_time.is_none()
                && self.start_minute.is_none()
                && self.end_minute.is_none()
        } else {
            self.start_time.is_some()
                && self.end_time.is_some()
                && self.start_minute.is_some()
                && self.end_minute.is_some()
        }
    }
}

/// Per-artist weekly recurring schedule, one entry per weekday
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    /// Day entries; always exactly the 7 fixed weekdays
    pub days: BTreeMap<WeekDay, DaySchedule>,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::all_off()
    }
}

impl WeeklySchedule {
    /// A schedule with every day fully off
    #[must_use]
    pub fn all_off() -> Self {
        let days = WeekDay::ALL
            .into_iter()
            .map(|day| (day, DaySchedule::fully_off()))
            .collect();
        Self { days }
    }

    /// Entry for one weekday; the map always carries all seven
    #[must_use]
    pub fn day(&self, day: WeekDay) -> &DaySchedule {
        self.days.get(&day).unwrap_or(&FULLY_OFF)
    }
}

static FULLY_OFF: DaySchedule = DaySchedule {
    start_time: None,
    end_time: None,
    start_minute: None,
    end_minute: None,
    off: true,
};

/// At most one active off-day window per artist schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffDays {
    /// First day off
    pub start_date: NaiveDate,
    /// Last day off, inclusive
    pub end_date: NaiveDate,
}

/// Position of an existing off-day window relative to "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffDayState {
    /// `now` lies inside the window
    Active,
    /// The window ended before `now`
    Expired,
    /// No window, or one entirely in the future
    None,
}

/// Stored schedule row for one artist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistSchedule {
    /// Owning artist
    pub artist_id: Uuid,
    /// Weekly recurring availability
    pub weekly: WeeklySchedule,
    /// Current off-day window, if any
    pub off_days: Option<OffDays>,
}
