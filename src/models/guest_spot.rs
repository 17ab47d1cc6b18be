// ABOUTME: Guest spot models for temporary artist relocation
// ABOUTME: TimeWindow, GeoPoint, and the GuestSpot entity
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schedule::OffDays;

/// Daily working window of a guest spot, minutes past midnight plus the
/// human-readable originals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start as entered, e.g. `"1:00 pm"`
    pub start_time: String,
    /// End as entered
    pub end_time: String,
    /// Start as minutes past midnight
    pub start_minute: u16,
    /// End as minutes past midnight
    pub end_minute: u16,
}

/// Geographic coordinates of a guest-spot venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Free-form venue label
    pub label: Option<String>,
}

/// A temporary alternate working location and time window for an artist
///
/// Invariant: no two guest spots of one artist overlap in date range, and the
/// time window never conflicts with main-location bookings inside the range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestSpot {
    /// Guest spot id
    pub id: Uuid,
    /// Relocating artist
    pub artist_id: Uuid,
    /// First day at the guest location
    pub start_date: NaiveDate,
    /// Last day, inclusive
    pub end_date: NaiveDate,
    /// Daily working window while relocated
    pub window: TimeWindow,
    /// Days off inside the relocation, if any
    pub off_days: Option<OffDays>,
    /// Venue coordinates
    pub location: GeoPoint,
    /// Whether the spot is live
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
