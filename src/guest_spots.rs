// ABOUTME: Guest spot scheduling with booking and date-range conflict checks
// ABOUTME: Half-open time-window intersection, inclusive date overlap, and location snapshots
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Guest Spot Scheduler
//!
//! A guest spot temporarily relocates an artist. Creation is refused when the
//! spot's daily time window would collide with an existing booking session at
//! the main location, or when another spot of the same artist overlaps the
//! date range. The spot insert and the artist's current-location snapshot
//! update share one transaction.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::availability::parse_time_12h;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    BookingStatus, CurrentLocation, GeoPoint, GuestSpot, OffDays, TimeWindow,
};

/// Booking statuses that hold calendar time and block a guest spot
const BLOCKING_STATUSES: [BookingStatus; 3] = [
    BookingStatus::Pending,
    BookingStatus::Confirmed,
    BookingStatus::InProgress,
];

/// Half-open minute-window intersection: `a.start < b.end && a.end > b.start`
#[must_use]
pub const fn windows_overlap(a_start: u16, a_end: u16, b_start: u16, b_end: u16) -> bool {
    a_start < b_end && a_end > b_start
}

/// Inclusive date-range overlap: `a.start <= b.end && a.end >= b.start`
#[must_use]
pub fn date_ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && a_end >= b_start
}

/// Request to create a guest spot
#[derive(Debug, Clone)]
pub struct GuestSpotRequest {
    /// Relocating artist
    pub artist_id: Uuid,
    /// First day at the guest location
    pub start_date: NaiveDate,
    /// Last day, inclusive
    pub end_date: NaiveDate,
    /// Daily start, 12-hour form
    pub start_time: String,
    /// Daily end, 12-hour form
    pub end_time: String,
    /// Days off inside the relocation
    pub off_days: Option<OffDays>,
    /// Venue coordinates
    pub location: GeoPoint,
}

/// Partial update for an existing guest spot; omitted fields keep their value
#[derive(Debug, Clone, Default)]
pub struct GuestSpotPatch {
    /// New first day
    pub start_date: Option<NaiveDate>,
    /// New last day
    pub end_date: Option<NaiveDate>,
    /// New daily start, 12-hour form
    pub start_time: Option<String>,
    /// New daily end, 12-hour form
    pub end_time: Option<String>,
    /// Replacement nested off-days
    pub off_days: Option<OffDays>,
    /// Replacement venue coordinates
    pub location: Option<GeoPoint>,
}

/// Guest spot scheduler bound to the store
#[derive(Clone)]
pub struct GuestSpotScheduler {
    db: Arc<Database>,
}

impl GuestSpotScheduler {
    /// Create a scheduler over the shared database handle
    #[must_use]
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a guest spot, conflict-checked against bookings and other spots
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown artist, `BadRequest` for inverted ranges or
    /// malformed times, `Conflict` on booking or date-range collisions.
    pub async fn create_guest_spot(&self, request: GuestSpotRequest) -> AppResult<GuestSpot> {
        if request.end_date < request.start_date {
            return Err(AppError::bad_request("guest spot must end on or after its start"));
        }

        let artist = self
            .db
            .get_artist(request.artist_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("artist {} not found", request.artist_id)))?;

        let window = parse_window(&request.start_time, &request.end_time)?;

        self.reject_booking_conflicts(
            request.artist_id,
            request.start_date,
            request.end_date,
            &window,
        )
        .await?;
        self.reject_spot_overlap(request.artist_id, request.start_date, request.end_date, None)
            .await?;

        let spot = GuestSpot {
            id: Uuid::new_v4(),
            artist_id: artist.id,
            start_date: request.start_date,
            end_date: request.end_date,
            window,
            off_days: request.off_days,
            location: request.location,
            is_active: true,
            created_at: Utc::now(),
        };

        let location = CurrentLocation {
            latitude: spot.location.latitude,
            longitude: spot.location.longitude,
            valid_until: spot.end_date,
        };

        self.db.create_guest_spot(&spot, &location).await?;

        tracing::info!(
            artist_id = %spot.artist_id,
            spot_id = %spot.id,
            start = %spot.start_date,
            end = %spot.end_date,
            "guest spot created"
        );

        Ok(spot)
    }

    /// Update a guest spot, re-running every conflict check on the merged window
    ///
    /// # Errors
    ///
    /// `Forbidden` once the spot's end date has passed; otherwise the same
    /// taxonomy as creation.
    pub async fn update_guest_spot(
        &self,
        spot_id: Uuid,
        patch: GuestSpotPatch,
    ) -> AppResult<GuestSpot> {
        self.update_guest_spot_at(spot_id, patch, Utc::now().date_naive())
            .await
    }

    /// `update_guest_spot` with an explicit "today" for deterministic evaluation
    pub async fn update_guest_spot_at(
        &self,
        spot_id: Uuid,
        patch: GuestSpotPatch,
        today: NaiveDate,
    ) -> AppResult<GuestSpot> {
        let mut spot = self
            .db
            .get_guest_spot(spot_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("guest spot {spot_id} not found")))?;

        if spot.end_date < today {
            return Err(AppError::forbidden("a past guest spot cannot be edited"));
        }

        spot.start_date = patch.start_date.unwrap_or(spot.start_date);
        spot.end_date = patch.end_date.unwrap_or(spot.end_date);
        if spot.end_date < spot.start_date {
            return Err(AppError::bad_request("guest spot must end on or after its start"));
        }

        if patch.start_time.is_some() || patch.end_time.is_some() {
            let start = patch.start_time.unwrap_or_else(|| spot.window.start_time.clone());
            let end = patch.end_time.unwrap_or_else(|| spot.window.end_time.clone());
            spot.window = parse_window(&start, &end)?;
        }
        if let Some(off_days) = patch.off_days {
            spot.off_days = Some(off_days);
        }
        if let Some(location) = patch.location {
            spot.location = location;
        }

        // Covers main-location sessions and ones already placed inside other
        // guest spots: any blocking session in the merged range counts.
        self.reject_booking_conflicts(spot.artist_id, spot.start_date, spot.end_date, &spot.window)
            .await?;
        self.reject_spot_overlap(spot.artist_id, spot.start_date, spot.end_date, Some(spot.id))
            .await?;

        let location = CurrentLocation {
            latitude: spot.location.latitude,
            longitude: spot.location.longitude,
            valid_until: spot.end_date,
        };
        self.db.update_guest_spot(&spot, &location).await?;

        Ok(spot)
    }

    /// Deactivate a guest spot; already-inactive spots report Conflict
    pub async fn deactivate_guest_spot(&self, spot_id: Uuid) -> AppResult<()> {
        self.db
            .get_guest_spot(spot_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("guest spot {spot_id} not found")))?;

        if self.db.deactivate_guest_spot(spot_id).await? {
            Ok(())
        } else {
            Err(AppError::conflict("guest spot is already inactive"))
        }
    }

    /// Conflict when a blocking booking session sits inside the date range and
    /// its minute window intersects the spot's window
    async fn reject_booking_conflicts(
        &self,
        artist_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        window: &TimeWindow,
    ) -> AppResult<()> {
        let bookings = self
            .db
            .bookings_for_artist(artist_id, &BLOCKING_STATUSES)
            .await?;

        for booking in &bookings {
            for session in &booking.sessions {
                let in_range = start_date <= session.date && session.date <= end_date;
                if in_range
                    && windows_overlap(
                        session.start_minute,
                        session.end_minute,
                        window.start_minute,
                        window.end_minute,
                    )
                {
                    return Err(AppError::conflict(format!(
                        "booking {} session {} collides with the guest spot window",
                        booking.id, session.session_number
                    )));
                }
            }
        }

        Ok(())
    }

    /// Conflict when another active spot of the artist overlaps the date range
    async fn reject_spot_overlap(
        &self,
        artist_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclude: Option<Uuid>,
    ) -> AppResult<()> {
        let spots = self.db.guest_spots_for_artist(artist_id).await?;

        for other in spots {
            if Some(other.id) == exclude || !other.is_active {
                continue;
            }
            if date_ranges_overlap(other.start_date, other.end_date, start_date, end_date) {
                return Err(AppError::conflict(format!(
                    "guest spot {} already covers part of that date range",
                    other.id
                )));
            }
        }

        Ok(())
    }
}

fn parse_window(start_time: &str, end_time: &str) -> AppResult<TimeWindow> {
    let start_minute = parse_time_12h(start_time)?;
    let end_minute = parse_time_12h(end_time)?;
    if end_minute <= start_minute {
        return Err(AppError::bad_request("time window must end after it starts"));
    }
    Ok(TimeWindow {
        start_time: start_time.to_string(),
        end_time: end_time.to_string(),
        start_minute,
        end_minute,
    })
}
