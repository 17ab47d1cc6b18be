// ABOUTME: Booking aggregate with embedded sessions and forward-only state machines
// ABOUTME: BookingStatus, PaymentStatus, Session, price breakdown, and cancellation metadata
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Lifecycle state of a booking
///
/// Transitions only move forward: `Pending → Confirmed → InProgress →
/// ReadyForCompletion → Completed`, with `Cancelled` reachable from the first
/// three states. Terminal states reject every further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Created, awaiting artist confirmation
    Pending,
    /// Accepted by the artist
    Confirmed,
    /// At least one session has been scheduled
    InProgress,
    /// Every session completed; waiting on the client OTP
    ReadyForCompletion,
    /// OTP verified, funds released
    Completed,
    /// Cancelled by client, artist, or admin
    Cancelled,
}

impl BookingStatus {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::InProgress => "in_progress",
            Self::ReadyForCompletion => "ready_for_completion",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the booking accepts no further mutations
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether cancellation is still permitted from this state
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed | Self::InProgress)
    }
}

impl Display for BookingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "in_progress" => Ok(Self::InProgress),
            "ready_for_completion" => Ok(Self::ReadyForCompletion),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::bad_request(format!(
                "unknown booking status: {other}"
            ))),
        }
    }
}

/// Payment state of a booking, advanced only by the payment synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No confirmed payment yet
    Pending,
    /// Gateway reported a completed checkout; funds held
    Authorized,
    /// Funds released to the artist at completion
    Paid,
    /// Gateway reported a failed payment
    Failed,
    /// Charge refunded after cancellation
    Refunded,
}

impl PaymentStatus {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Whether funds were captured and a cancellation must trigger a refund
    #[must_use]
    pub const fn is_captured(self) -> bool {
        matches!(self, Self::Authorized | Self::Paid)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "authorized" => Ok(Self::Authorized),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(AppError::bad_request(format!(
                "unknown payment status: {other}"
            ))),
        }
    }
}

/// Status of a single session inside a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Proposed but not yet placed on the calendar
    Pending,
    /// Placed on the calendar
    Scheduled,
    /// Moved after an initial scheduling
    Rescheduled,
    /// Work done
    Completed,
}

/// One scheduled time-block of a multi-session booking
///
/// Sessions are value records owned by their booking; they are created,
/// updated, and deleted only through the booking engine and never persisted
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// 1-based ordinal within the booking
    pub session_number: u32,
    /// Calendar date of the session
    pub date: NaiveDate,
    /// Human-readable start, e.g. `"2:00 pm"`
    pub start_time: String,
    /// Human-readable end
    pub end_time: String,
    /// Start expressed as minutes past midnight
    pub start_minute: u16,
    /// End expressed as minutes past midnight
    pub end_minute: u16,
    /// Scheduling state
    pub status: SessionStatus,
}

/// Who triggered a cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelActor {
    /// The booking client
    Client,
    /// The booked artist
    Artist,
    /// Platform staff
    Admin,
}

impl CancelActor {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Artist => "artist",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for CancelActor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Self::Client),
            "artist" => Ok(Self::Artist),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::bad_request(format!("unknown actor: {other}"))),
        }
    }
}

/// Price split derived at booking creation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    /// Service price charged to the client
    pub price: f64,
    /// Gateway's cut
    pub gateway_fee: f64,
    /// Platform's cut
    pub platform_fee: f64,
    /// What the artist receives at completion
    pub artist_earning: f64,
}

impl PriceBreakdown {
    /// Split a service price using the configured fee rates
    #[must_use]
    pub fn from_price(price: f64, gateway_rate: f64, platform_rate: f64) -> Self {
        let gateway_fee = price * gateway_rate;
        let platform_fee = price * platform_rate;
        Self {
            price,
            gateway_fee,
            platform_fee,
            artist_earning: price - gateway_fee - platform_fee,
        }
    }
}

/// Client review left on a completed booking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    /// 1 to 5 stars
    pub rating: u8,
    /// Optional free-form text
    pub text: Option<String>,
    /// When the review was left
    pub created_at: DateTime<Utc>,
}

/// A client's engagement of an artist for a service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id
    pub id: Uuid,
    /// Booked artist
    pub artist_id: Uuid,
    /// Requesting client
    pub client_id: Uuid,
    /// Purchased service
    pub service_id: Uuid,
    /// Client's preferred window, start of range
    pub preferred_start: NaiveDate,
    /// Client's preferred window, end of range
    pub preferred_end: NaiveDate,
    /// Ordered owned sessions
    pub sessions: Vec<Session>,
    /// Lifecycle state
    pub status: BookingStatus,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Derived fee split
    pub pricing: PriceBreakdown,
    /// Gateway payment reference once authorized
    pub payment_ref: Option<String>,
    /// SHA-256 hex of the active completion OTP
    pub otp_hash: Option<String>,
    /// When the active OTP stops being accepted
    pub otp_expires_at: Option<DateTime<Utc>>,
    /// When the booking was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Who cancelled
    pub cancelled_by: Option<CancelActor>,
    /// Client review, completed bookings only
    pub review: Option<Review>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Completion timestamp
    pub completed_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Look up a session by its ordinal
    #[must_use]
    pub fn session(&self, session_number: u32) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| s.session_number == session_number)
    }

    /// Whether every session is completed (false when there are none)
    #[must_use]
    pub fn all_sessions_completed(&self) -> bool {
        !self.sessions.is_empty()
            && self
                .sessions
                .iter()
                .all(|s| s.status == SessionStatus::Completed)
    }
}
