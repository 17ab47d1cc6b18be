// ABOUTME: Notification dispatch seam with per-channel failure isolation
// ABOUTME: Fire-and-forget fan-out so delivery can never block a domain transition
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Notification Dispatch
//!
//! The core never awaits delivery success. Call sites either spawn
//! [`fan_out`] or invoke [`NotificationDispatcher::notify`] and log the error;
//! a failing channel must never fail the transition that triggered it.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AppResult;

/// Template identifiers for client-visible transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTemplate {
    /// A client requested a booking
    BookingRequested,
    /// The artist confirmed
    BookingConfirmed,
    /// A session was scheduled or moved
    SessionScheduled,
    /// Every session done, OTP on its way
    BookingReadyForCompletion,
    /// OTP verified, booking closed
    BookingCompleted,
    /// Booking cancelled
    BookingCancelled,
    /// Gateway authorized the payment
    PaymentAuthorized,
    /// Gateway reported a failed payment
    PaymentFailed,
    /// Charge refunded
    PaymentRefunded,
}

impl NotificationTemplate {
    /// Template name handed to the delivery channel
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BookingRequested => "booking_requested",
            Self::BookingConfirmed => "booking_confirmed",
            Self::SessionScheduled => "session_scheduled",
            Self::BookingReadyForCompletion => "booking_ready_for_completion",
            Self::BookingCompleted => "booking_completed",
            Self::BookingCancelled => "booking_cancelled",
            Self::PaymentAuthorized => "payment_authorized",
            Self::PaymentFailed => "payment_failed",
            Self::PaymentRefunded => "payment_refunded",
        }
    }
}

/// Outbound notification channel seam
///
/// Implementations wrap the real delivery transports (email, push, socket).
/// The core treats them as unreliable: errors are logged at the edge and
/// never propagated into domain transitions.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one notification on one channel
    async fn notify(
        &self,
        channel: &str,
        recipient: &str,
        template: NotificationTemplate,
        data: Value,
    ) -> AppResult<()>;
}

/// Deliver the same notification across every configured channel
///
/// Failures are isolated per channel: a failing channel is logged and the
/// remaining channels still receive the notification.
pub async fn fan_out(
    dispatcher: &dyn NotificationDispatcher,
    channels: &[String],
    recipient: &str,
    template: NotificationTemplate,
    data: &Value,
) {
    for channel in channels {
        if let Err(err) = dispatcher
            .notify(channel, recipient, template, data.clone())
            .await
        {
            tracing::warn!(
                channel = %channel,
                template = template.as_str(),
                error = %err,
                "notification channel failed; continuing with remaining channels"
            );
        }
    }
}

/// Default dispatcher that only logs deliveries
///
/// Useful for local runs and as a stand-in until real transports are wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingDispatcher {
    async fn notify(
        &self,
        channel: &str,
        recipient: &str,
        template: NotificationTemplate,
        data: Value,
    ) -> AppResult<()> {
        tracing::info!(
            channel = %channel,
            recipient = %recipient,
            template = template.as_str(),
            payload = %data,
            "notification dispatched"
        );
        Ok(())
    }
}
