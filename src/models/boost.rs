// ABOUTME: Time-bounded paid profile boost models
// ABOUTME: ArtistBoost entity, its payment status, and the artist-embedded snapshot
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Payment state of a boost
///
/// A boost is created `Pending` when the checkout session is opened and only
/// becomes `Succeeded` once the gateway confirms the payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostPaymentStatus {
    /// Checkout opened, payment not confirmed
    Pending,
    /// Gateway confirmed the payment
    Succeeded,
    /// Gateway reported failure
    Failed,
}

impl BoostPaymentStatus {
    /// Convert to string for database storage
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for BoostPaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(AppError::bad_request(format!(
                "unknown boost payment status: {other}"
            ))),
        }
    }
}

/// A time-bounded paid promotion of an artist's profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistBoost {
    /// Boost id
    pub id: Uuid,
    /// Promoted artist
    pub artist_id: Uuid,
    /// Promotion start
    pub start_time: DateTime<Utc>,
    /// Promotion end; the sweeper deactivates once this elapses
    pub end_time: DateTime<Utc>,
    /// Payment state
    pub payment_status: BoostPaymentStatus,
    /// Gateway checkout session backing the boost
    pub checkout_session_id: Option<String>,
    /// Whether the promotion currently applies
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ArtistBoost {
    /// Snapshot mirrored onto the owning artist's profile
    #[must_use]
    pub fn snapshot(&self) -> BoostSnapshot {
        BoostSnapshot {
            boost_id: self.id,
            start_time: self.start_time,
            end_time: self.end_time,
            is_active: self.is_active,
        }
    }
}

/// Boost summary embedded in the artist profile for cheap reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostSnapshot {
    /// Backing boost
    pub boost_id: Uuid,
    /// Promotion start
    pub start_time: DateTime<Utc>,
    /// Promotion end
    pub end_time: DateTime<Utc>,
    /// Mirrors the boost's active flag
    pub is_active: bool,
}
