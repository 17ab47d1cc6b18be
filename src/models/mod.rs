// ABOUTME: Domain model definitions for the Inkmarket core
// ABOUTME: Bookings, schedules, guest spots, boosts, and profile projections
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Domain models. Status fields are closed enumerations so every transition
//! site matches exhaustively; embedded collections (sessions, weekly days,
//! boost snapshots) are value records serialized as JSON columns.

/// Booking aggregate, sessions, and status state machines
pub mod booking;
/// Time-bounded paid profile boosts
pub mod boost;
/// Temporary guest-spot relocations
pub mod guest_spot;
/// Minimal artist/client/service projections
pub mod profile;
/// Weekly availability and off-day windows
pub mod schedule;

pub use booking::{
    Booking, BookingStatus, CancelActor, PaymentStatus, PriceBreakdown, Review, Session,
    SessionStatus,
};
pub use boost::{ArtistBoost, BoostPaymentStatus, BoostSnapshot};
pub use guest_spot::{GeoPoint, GuestSpot, TimeWindow};
pub use profile::{ArtistProfile, ClientProfile, CurrentLocation, ServiceOffering};
pub use schedule::{ArtistSchedule, DaySchedule, OffDayState, OffDays, WeekDay, WeeklySchedule};
