// ABOUTME: Minimal profile projections referenced by the core
// ABOUTME: Artist, client, and service records with only the fields the engine reads or writes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::boost::BoostSnapshot;

/// Where the artist currently works, updated when a guest spot begins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentLocation {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Date until which this location is valid
    pub valid_until: NaiveDate,
}

/// Artist projection: the fields the core reads plus the ones it writes back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistProfile {
    /// Artist id
    pub id: Uuid,
    /// Display name
    pub display_name: String,
    /// Contact address used for OTP delivery and notifications
    pub contact_email: String,
    /// Lifetime earnings, written at booking completion
    pub earnings: f64,
    /// Current working location snapshot
    pub current_location: Option<CurrentLocation>,
    /// Embedded boost snapshot mirrored by the sweeper
    pub boost: Option<BoostSnapshot>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Client projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Client id
    pub id: Uuid,
    /// Display name
    pub display_name: String,
    /// Contact address used for OTP delivery and notifications
    pub contact_email: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A purchasable tattoo service offered by an artist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOffering {
    /// Service id
    pub id: Uuid,
    /// Offering artist
    pub artist_id: Uuid,
    /// Display name
    pub name: String,
    /// Price in currency units
    pub price: f64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}
