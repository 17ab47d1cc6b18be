// ABOUTME: Payment gateway seam and the idempotent payment-state synchronizer
// ABOUTME: Gateway events advance booking/boost payment state exactly once per transition
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Payment-State Synchronizer
//!
//! Gateway webhooks are delivered at-least-once. Every handler here applies a
//! state-guarded update and treats "no row moved" as an already-applied
//! delivery, so replaying an event is a no-op. Correlation travels in the
//! event metadata as `booking:<uuid>` or `boost:<uuid>`.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::notifications::{fan_out, NotificationDispatcher, NotificationTemplate};

/// A checkout session opened at the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Gateway-side session id
    pub id: String,
    /// Hosted checkout URL handed to the client
    pub url: String,
}

/// Outbound payment-gateway seam
///
/// Wire details live behind this trait; the core only cares about session
/// lifecycle and the payout/refund signals it must emit.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session carrying the correlation id in its metadata
    async fn create_checkout_session(
        &self,
        amount: f64,
        correlation: &str,
    ) -> AppResult<CheckoutSession>;

    /// Cancel a session, used as compensation when a local write fails
    async fn cancel_checkout_session(&self, session_id: &str) -> AppResult<()>;

    /// Release the artist's earning after OTP-gated completion
    async fn release_payout(&self, payment_ref: &str, amount: f64) -> AppResult<()>;

    /// Refund a captured charge after cancellation
    async fn refund_charge(&self, payment_ref: &str) -> AppResult<()>;
}

/// What a gateway event's metadata points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationTarget {
    /// A booking payment
    Booking(Uuid),
    /// A boost payment
    Boost(Uuid),
}

impl FromStr for CorrelationTarget {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| AppError::bad_request(format!("malformed correlation id: {s}")))?;
        let id = Uuid::parse_str(id)
            .map_err(|_| AppError::bad_request(format!("malformed correlation id: {s}")))?;
        match kind {
            "booking" => Ok(Self::Booking(id)),
            "boost" => Ok(Self::Boost(id)),
            other => Err(AppError::bad_request(format!(
                "unknown correlation target: {other}"
            ))),
        }
    }
}

/// Inbound gateway event, one variant per webhook type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Checkout finished; funds are held
    CheckoutCompleted {
        /// Gateway payment reference
        reference: String,
        /// `booking:<uuid>` or `boost:<uuid>`
        correlation: String,
    },
    /// Payment attempt failed
    PaymentFailed {
        /// `booking:<uuid>` or `boost:<uuid>`
        correlation: String,
    },
    /// A captured charge was refunded
    ChargeRefunded {
        /// `booking:<uuid>` or `boost:<uuid>`
        correlation: String,
    },
}

/// Applies gateway events to booking and boost payment state
#[derive(Clone)]
pub struct PaymentSynchronizer {
    db: Arc<Database>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    channels: Vec<String>,
}

impl PaymentSynchronizer {
    /// Create a synchronizer over the shared database handle
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        channels: Vec<String>,
    ) -> Self {
        Self {
            db,
            dispatcher,
            channels,
        }
    }

    /// Apply one gateway event; safe to call repeatedly with the same event
    ///
    /// # Errors
    ///
    /// `BadRequest` for malformed correlation ids, `NotFound` when the
    /// referenced record does not exist. An already-applied event is not an
    /// error.
    pub async fn handle_event(&self, event: GatewayEvent) -> AppResult<()> {
        match event {
            GatewayEvent::CheckoutCompleted {
                reference,
                correlation,
            } => match correlation.parse::<CorrelationTarget>()? {
                CorrelationTarget::Booking(id) => self.booking_authorized(id, &reference).await,
                CorrelationTarget::Boost(id) => self.boost_succeeded(id).await,
            },
            GatewayEvent::PaymentFailed { correlation } => {
                match correlation.parse::<CorrelationTarget>()? {
                    CorrelationTarget::Booking(id) => self.booking_failed(id).await,
                    CorrelationTarget::Boost(id) => {
                        self.require_boost(id).await?;
                        // The row must stop counting as open or the artist
                        // could never start another boost
                        let applied = self.db.mark_boost_payment_failed(id).await?;
                        if applied {
                            tracing::warn!(boost_id = %id, "boost payment failed");
                        } else {
                            tracing::debug!(boost_id = %id, "payment-failed replayed; no-op");
                        }
                        Ok(())
                    }
                }
            }
            GatewayEvent::ChargeRefunded { correlation } => {
                match correlation.parse::<CorrelationTarget>()? {
                    CorrelationTarget::Booking(id) => self.booking_refunded(id).await,
                    CorrelationTarget::Boost(id) => {
                        self.require_boost(id).await?;
                        let deactivated = self.db.deactivate_boost(id).await?;
                        tracing::info!(boost_id = %id, deactivated, "boost charge refunded");
                        Ok(())
                    }
                }
            }
        }
    }

    async fn booking_authorized(&self, booking_id: Uuid, reference: &str) -> AppResult<()> {
        let booking = self
            .db
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("booking {booking_id} not found")))?;

        let applied = self.db.mark_booking_authorized(booking_id, reference).await?;
        if !applied {
            tracing::debug!(booking_id = %booking_id, "checkout-completed replayed; no-op");
            return Ok(());
        }

        tracing::info!(booking_id = %booking_id, "booking payment authorized");

        // Per-channel failure isolation: a dead channel never blocks the rest
        if let Some(client) = self.db.get_client(booking.client_id).await? {
            fan_out(
                self.dispatcher.as_ref(),
                &self.channels,
                &client.contact_email,
                NotificationTemplate::PaymentAuthorized,
                &json!({ "booking_id": booking_id, "reference": reference }),
            )
            .await;
        }
        if let Some(artist) = self.db.get_artist(booking.artist_id).await? {
            fan_out(
                self.dispatcher.as_ref(),
                &self.channels,
                &artist.contact_email,
                NotificationTemplate::PaymentAuthorized,
                &json!({ "booking_id": booking_id }),
            )
            .await;
        }

        Ok(())
    }

    async fn booking_failed(&self, booking_id: Uuid) -> AppResult<()> {
        let booking = self
            .db
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("booking {booking_id} not found")))?;

        let applied = self.db.mark_booking_payment_failed(booking_id).await?;
        if !applied {
            tracing::debug!(booking_id = %booking_id, "payment-failed replayed; no-op");
            return Ok(());
        }

        tracing::warn!(booking_id = %booking_id, "booking payment failed; reverted to pending");

        if let Some(client) = self.db.get_client(booking.client_id).await? {
            fan_out(
                self.dispatcher.as_ref(),
                &self.channels,
                &client.contact_email,
                NotificationTemplate::PaymentFailed,
                &json!({ "booking_id": booking_id }),
            )
            .await;
        }
        Ok(())
    }

    async fn booking_refunded(&self, booking_id: Uuid) -> AppResult<()> {
        let booking = self
            .db
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("booking {booking_id} not found")))?;

        let applied = self.db.mark_booking_refunded(booking_id).await?;
        if !applied {
            tracing::debug!(booking_id = %booking_id, "charge-refunded replayed; no-op");
            return Ok(());
        }

        tracing::info!(booking_id = %booking_id, "booking refunded and cancelled");

        if let Some(client) = self.db.get_client(booking.client_id).await? {
            fan_out(
                self.dispatcher.as_ref(),
                &self.channels,
                &client.contact_email,
                NotificationTemplate::PaymentRefunded,
                &json!({ "booking_id": booking_id }),
            )
            .await;
        }
        Ok(())
    }

    async fn boost_succeeded(&self, boost_id: Uuid) -> AppResult<()> {
        self.require_boost(boost_id).await?;

        let applied = self.db.mark_boost_succeeded(boost_id).await?;
        if !applied {
            tracing::debug!(boost_id = %boost_id, "boost checkout replayed; no-op");
            return Ok(());
        }

        // Refresh the artist's embedded snapshot from the updated row
        if let Some(boost) = self.db.get_boost(boost_id).await? {
            self.db
                .update_artist_boost_snapshot(boost.artist_id, &boost.snapshot())
                .await?;
            tracing::info!(boost_id = %boost_id, artist_id = %boost.artist_id, "boost activated");
        }
        Ok(())
    }

    async fn require_boost(&self, boost_id: Uuid) -> AppResult<()> {
        self.db
            .get_boost(boost_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::not_found(format!("boost {boost_id} not found")))
    }
}
