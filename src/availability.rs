// ABOUTME: Weekly availability normalization and off-day window management
// ABOUTME: 12-hour time parsing, schedule merging, and booking-conflict-gated time off
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Availability & Off-Days Manager
//!
//! Weekly schedules are only ever written through [`normalize_weekly_schedule`],
//! which merges a partial patch with the stored state and guarantees every one
//! of the 7 weekdays comes out either fully off or fully populated.
//!
//! Off-day windows go through a three-branch rule set keyed by
//! [`classify_off_days`]: an active window may only be extended, an expired one
//! may be overridden, and a fresh one must start today or later. Every branch
//! gates on existing pending/confirmed bookings in the affected date range.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ArtistSchedule, BookingStatus, DaySchedule, OffDayState, OffDays, WeekDay, WeeklySchedule,
};

/// Partial update for one weekday
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayPatch {
    /// Mark the day fully off, discarding any stored times
    #[serde(default)]
    pub off: bool,
    /// Replacement start time, 12-hour form
    pub start_time: Option<String>,
    /// Replacement end time, 12-hour form
    pub end_time: Option<String>,
}

/// Partial weekly-schedule update; omitted days carry forward the stored entry
pub type WeeklyPatch = BTreeMap<WeekDay, DayPatch>;

/// Parse a 12-hour clock string into minutes past midnight
///
/// Accepts an optional leading zero on the hour and a case-insensitive
/// `am`/`pm` suffix, with or without a separating space (`"2:00 pm"`,
/// `"02:00PM"`).
///
/// # Errors
///
/// Returns `BadRequest` for anything that is not a valid 12-hour time.
pub fn parse_time_12h(input: &str) -> AppResult<u16> {
    let normalized = input.trim().to_ascii_lowercase();

    let (clock, is_pm) = if let Some(rest) = normalized.strip_suffix("pm") {
        (rest.trim_end(), true)
    } else if let Some(rest) = normalized.strip_suffix("am") {
        (rest.trim_end(), false)
    } else {
        return Err(AppError::bad_request(format!(
            "time '{input}' is missing an am/pm suffix"
        )));
    };

    let (hour_str, minute_str) = clock.split_once(':').ok_or_else(|| {
        AppError::bad_request(format!("time '{input}' is not in h:mm form"))
    })?;

    let hour: u16 = hour_str
        .parse()
        .map_err(|_| AppError::bad_request(format!("time '{input}' has a malformed hour")))?;
    if !(1..=12).contains(&hour) {
        return Err(AppError::bad_request(format!(
            "time '{input}' has an hour outside 1-12"
        )));
    }

    if minute_str.len() != 2 {
        return Err(AppError::bad_request(format!(
            "time '{input}' needs a two-digit minute"
        )));
    }
    let minute: u16 = minute_str
        .parse()
        .map_err(|_| AppError::bad_request(format!("time '{input}' has a malformed minute")))?;
    if minute > 59 {
        return Err(AppError::bad_request(format!(
            "time '{input}' has a minute outside 0-59"
        )));
    }

    let base = (hour % 12) * 60 + minute;
    Ok(if is_pm { base + 720 } else { base })
}

/// Merge a partial weekly patch with the stored schedule
///
/// Every weekday in the result is fully defined: omitted days carry forward
/// the existing entry (or default to fully off), `off` days are reset, and
/// provided times are merged with the existing ones before the minute fields
/// are recomputed.
///
/// # Errors
///
/// Returns `BadRequest` when a day ends up with only one of start/end, an
/// unparseable time, or an end not after its start.
pub fn normalize_weekly_schedule(
    input: &WeeklyPatch,
    existing: Option<&WeeklySchedule>,
) -> AppResult<WeeklySchedule> {
    let mut days = BTreeMap::new();

    for day in WeekDay::ALL {
        let entry = match input.get(&day) {
            None => existing.map_or_else(DaySchedule::fully_off, |s| s.day(day).clone()),
            Some(patch) if patch.off => DaySchedule::fully_off(),
            Some(patch) => {
                let prior = existing.map(|s| s.day(day));
                let start_time = patch
                    .start_time
                    .clone()
                    .or_else(|| prior.and_then(|p| p.start_time.clone()));
                let end_time = patch
                    .end_time
                    .clone()
                    .or_else(|| prior.and_then(|p| p.end_time.clone()));

                let (Some(start_time), Some(end_time)) = (start_time, end_time) else {
                    return Err(AppError::bad_request(format!(
                        "{day} needs both a start and an end time"
                    )));
                };

                let start_minute = parse_time_12h(&start_time)?;
                let end_minute = parse_time_12h(&end_time)?;
                if end_minute <= start_minute {
                    return Err(AppError::bad_request(format!(
                        "{day} must end after it starts"
                    )));
                }

                DaySchedule {
                    start_time: Some(start_time),
                    end_time: Some(end_time),
                    start_minute: Some(start_minute),
                    end_minute: Some(end_minute),
                    off: false,
                }
            }
        };
        days.insert(day, entry);
    }

    Ok(WeeklySchedule { days })
}

/// Classify an existing off-day window relative to today
///
/// A future window classifies as [`OffDayState::None`]; the none/future branch
/// of `set_time_off` handles both the same way.
#[must_use]
pub fn classify_off_days(today: NaiveDate, existing: Option<OffDays>) -> OffDayState {
    match existing {
        Some(window) if window.start_date <= today && today <= window.end_date => {
            OffDayState::Active
        }
        Some(window) if window.end_date < today => OffDayState::Expired,
        _ => OffDayState::None,
    }
}

/// Availability manager bound to the store
#[derive(Clone)]
pub struct AvailabilityManager {
    db: Arc<Database>,
}

impl AvailabilityManager {
    /// Create a manager over the shared database handle
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Merge and persist a weekly-schedule patch for an artist
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown artist, `BadRequest` for malformed patches.
    pub async fn update_weekly_schedule(
        &self,
        artist_id: Uuid,
        input: &WeeklyPatch,
    ) -> AppResult<WeeklySchedule> {
        self.require_artist(artist_id).await?;

        let stored = self.db.get_schedule(artist_id).await?;
        let weekly = normalize_weekly_schedule(input, stored.as_ref().map(|s| &s.weekly))?;

        self.db
            .upsert_schedule(&ArtistSchedule {
                artist_id,
                weekly: weekly.clone(),
                off_days: stored.and_then(|s| s.off_days),
            })
            .await?;

        Ok(weekly)
    }

    /// Set or adjust the artist's off-day window, gated by booking conflicts
    ///
    /// # Errors
    ///
    /// `BadRequest` for inverted or past-dated windows and for shrinking an
    /// active window; `Conflict` when a pending/confirmed booking falls in the
    /// newly blocked range.
    pub async fn set_time_off(
        &self,
        artist_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<OffDays> {
        self.set_time_off_at(artist_id, start_date, end_date, Utc::now().date_naive())
            .await
    }

    /// `set_time_off` with an explicit "today" for deterministic evaluation
    pub async fn set_time_off_at(
        &self,
        artist_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        today: NaiveDate,
    ) -> AppResult<OffDays> {
        if end_date <= start_date {
            return Err(AppError::bad_request("off-days must end after they start"));
        }

        self.require_artist(artist_id).await?;
        let stored = self.db.get_schedule(artist_id).await?;
        let existing = stored.as_ref().and_then(|s| s.off_days);

        let window = match classify_off_days(today, existing) {
            OffDayState::Active => {
                // Only extending the end of a window the artist is already inside
                let current = existing.ok_or_else(|| {
                    AppError::internal("active off-days classified without a window")
                })?;
                if end_date <= current.end_date {
                    return Err(AppError::bad_request(
                        "an active off-day window can only be extended",
                    ));
                }
                self.reject_booking_conflicts(artist_id, current.end_date, end_date)
                    .await?;
                OffDays {
                    start_date: current.start_date,
                    end_date,
                }
            }
            OffDayState::Expired => {
                self.reject_booking_conflicts(artist_id, start_date, end_date)
                    .await?;
                OffDays {
                    start_date,
                    end_date,
                }
            }
            OffDayState::None => {
                if start_date < today {
                    return Err(AppError::bad_request("off-days cannot start in the past"));
                }
                self.reject_booking_conflicts(artist_id, start_date, end_date)
                    .await?;
                OffDays {
                    start_date,
                    end_date,
                }
            }
        };

        self.db
            .upsert_schedule(&ArtistSchedule {
                artist_id,
                weekly: stored.map_or_else(WeeklySchedule::all_off, |s| s.weekly),
                off_days: Some(window),
            })
            .await?;

        Ok(window)
    }

    async fn require_artist(&self, artist_id: Uuid) -> AppResult<()> {
        self.db
            .get_artist(artist_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("artist {artist_id} not found")))
    }

    /// Conflict when a pending/confirmed booking has a day inside `[from, to)`
    async fn reject_booking_conflicts(
        &self,
        artist_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<()> {
        let bookings = self
            .db
            .bookings_for_artist(artist_id, &[BookingStatus::Pending, BookingStatus::Confirmed])
            .await?;

        for booking in bookings {
            let conflicted = if booking.sessions.is_empty() {
                // Unscheduled bookings still reserve their preferred range
                booking.preferred_start < to && booking.preferred_end >= from
            } else {
                booking
                    .sessions
                    .iter()
                    .any(|s| from <= s.date && s.date < to)
            };

            if conflicted {
                return Err(AppError::conflict(format!(
                    "booking {} falls inside the requested off-days",
                    booking.id
                )));
            }
        }

        Ok(())
    }
}
