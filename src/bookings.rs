// ABOUTME: Booking lifecycle engine: creation, confirmation, sessions, OTP completion, cancellation
// ABOUTME: Owns the forward-only status state machine and every session mutation
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Booking Engine
//!
//! The only writer of booking state. Statuses move forward along
//! `Pending → Confirmed → InProgress → ReadyForCompletion → Completed`, with
//! `Cancelled` reachable from the first three; every transition is a
//! state-guarded UPDATE so a concurrent webhook or second caller loses
//! cleanly. Sessions are owned value records mutated only here.
//!
//! Notification dispatch accompanies every client-visible transition but is
//! spawned fire-and-forget: a dead channel can never fail or delay a
//! transition.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::availability::parse_time_12h;
use crate::config::CoreConfig;
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, CancelActor, PriceBreakdown, Review, Session, SessionStatus,
};
use crate::notifications::{fan_out, NotificationDispatcher, NotificationTemplate};
use crate::otp::{generate_otp, verify_otp, OtpDelivery};
use crate::payments::PaymentGateway;

/// Client input for creating or moving a session
#[derive(Debug, Clone)]
pub struct SessionInput {
    /// 1-based ordinal; an existing ordinal is replaced
    pub session_number: u32,
    /// Calendar date
    pub date: NaiveDate,
    /// Start, 12-hour form
    pub start_time: String,
    /// End, 12-hour form
    pub end_time: String,
}

/// Booking lifecycle engine
#[derive(Clone)]
pub struct BookingEngine {
    db: Arc<Database>,
    config: CoreConfig,
    dispatcher: Arc<dyn NotificationDispatcher>,
    otp_delivery: Arc<dyn OtpDelivery>,
    gateway: Arc<dyn PaymentGateway>,
}

impl BookingEngine {
    /// Wire the engine to its store and collaborators
    #[must_use]
    pub fn new(
        db: Arc<Database>,
        config: CoreConfig,
        dispatcher: Arc<dyn NotificationDispatcher>,
        otp_delivery: Arc<dyn OtpDelivery>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            config,
            dispatcher,
            otp_delivery,
            gateway,
        }
    }

    /// Create a booking for a client against a service
    ///
    /// Validates every reference, derives the fee split, and inserts the
    /// booking `Pending`/`Pending` together with its preference record in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// `NotFound` for a missing client, service, or artist; `BadRequest` for
    /// an inverted preferred range.
    pub async fn create_booking(
        &self,
        client_id: Uuid,
        service_id: Uuid,
        preferred_start: NaiveDate,
        preferred_end: NaiveDate,
    ) -> AppResult<Booking> {
        if preferred_end < preferred_start {
            return Err(AppError::bad_request(
                "preferred range must end on or after its start",
            ));
        }

        let client = self
            .db
            .get_client(client_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("client {client_id} not found")))?;
        let service = self
            .db
            .get_service(service_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("service {service_id} not found")))?;
        let artist = self
            .db
            .get_artist(service.artist_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("artist {} not found", service.artist_id)))?;

        let booking = Booking {
            id: Uuid::new_v4(),
            artist_id: artist.id,
            client_id: client.id,
            service_id: service.id,
            preferred_start,
            preferred_end,
            sessions: Vec::new(),
            status: BookingStatus::Pending,
            payment_status: crate::models::PaymentStatus::Pending,
            pricing: PriceBreakdown::from_price(
                service.price,
                self.config.gateway_fee_rate,
                self.config.platform_fee_rate,
            ),
            payment_ref: None,
            otp_hash: None,
            otp_expires_at: None,
            cancelled_at: None,
            cancelled_by: None,
            review: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        self.db.create_booking(&booking).await?;
        tracing::info!(booking_id = %booking.id, artist_id = %artist.id, "booking created");

        self.dispatch(
            artist.contact_email,
            NotificationTemplate::BookingRequested,
            json!({ "booking_id": booking.id, "client": client.display_name }),
        );

        Ok(booking)
    }

    /// Artist accepts a pending booking
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the caller is not the booked artist, `Conflict`
    /// when the booking is no longer pending.
    pub async fn confirm_booking(&self, booking_id: Uuid, artist_id: Uuid) -> AppResult<Booking> {
        let booking = self.require_booking(booking_id).await?;
        if booking.artist_id != artist_id {
            return Err(AppError::unauthorized(
                "only the booked artist can confirm a booking",
            ));
        }

        let moved = self
            .db
            .transition_booking_status(booking_id, BookingStatus::Pending, BookingStatus::Confirmed)
            .await?;
        if !moved {
            return Err(AppError::conflict(format!(
                "booking is {} and cannot be confirmed",
                booking.status
            )));
        }

        self.notify_client(
            &booking,
            NotificationTemplate::BookingConfirmed,
            json!({ "booking_id": booking_id }),
        )
        .await;

        self.require_booking(booking_id).await
    }

    /// Insert or move a session on a confirmed or in-progress booking
    ///
    /// The session date must clear the artist's off-day window and weekly
    /// availability. The first scheduled session advances the booking to
    /// `InProgress`.
    ///
    /// # Errors
    ///
    /// `Conflict` for unavailable dates, completed sessions, or bookings not
    /// yet confirmed; `BadRequest` for malformed times.
    pub async fn add_or_update_session(
        &self,
        booking_id: Uuid,
        input: SessionInput,
    ) -> AppResult<Booking> {
        let mut booking = self.require_booking(booking_id).await?;

        match booking.status {
            BookingStatus::Confirmed | BookingStatus::InProgress => {}
            other => {
                return Err(AppError::conflict(format!(
                    "sessions cannot be scheduled while the booking is {other}"
                )))
            }
        }

        let start_minute = parse_time_12h(&input.start_time)?;
        let end_minute = parse_time_12h(&input.end_time)?;
        if end_minute <= start_minute {
            return Err(AppError::bad_request("session must end after it starts"));
        }

        self.check_artist_availability(booking.artist_id, input.date, start_minute, end_minute)
            .await?;

        let status = match booking.session(input.session_number) {
            Some(existing) if existing.status == SessionStatus::Completed => {
                return Err(AppError::conflict("a completed session cannot be moved"))
            }
            Some(_) => SessionStatus::Rescheduled,
            None => SessionStatus::Scheduled,
        };

        let session = Session {
            session_number: input.session_number,
            date: input.date,
            start_time: input.start_time,
            end_time: input.end_time,
            start_minute,
            end_minute,
            status,
        };

        booking.sessions.retain(|s| s.session_number != session.session_number);
        booking.sessions.push(session);
        booking.sessions.sort_by_key(|s| s.session_number);

        if !self
            .db
            .update_booking_sessions(booking_id, &booking.sessions)
            .await?
        {
            return Err(AppError::conflict("booking no longer accepts session changes"));
        }

        if booking.status == BookingStatus::Confirmed {
            self.db
                .transition_booking_status(
                    booking_id,
                    BookingStatus::Confirmed,
                    BookingStatus::InProgress,
                )
                .await?;
        }

        self.notify_client(
            &booking,
            NotificationTemplate::SessionScheduled,
            json!({ "booking_id": booking_id, "date": booking.sessions.last().map(|s| s.date) }),
        )
        .await;

        self.require_booking(booking_id).await
    }

    /// Mark one session done; the last one arms the OTP gate
    ///
    /// When every session is completed the booking moves to
    /// `ReadyForCompletion`, a fresh OTP is stored hashed, and the plain code
    /// goes to the delivery collaborator. Delivery failure is logged only.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown session, `Conflict` when the booking is not
    /// in progress.
    pub async fn complete_session(
        &self,
        booking_id: Uuid,
        session_number: u32,
    ) -> AppResult<Booking> {
        let mut booking = self.require_booking(booking_id).await?;

        if booking.status != BookingStatus::InProgress {
            return Err(AppError::conflict(format!(
                "sessions cannot be completed while the booking is {}",
                booking.status
            )));
        }

        let session = booking
            .sessions
            .iter_mut()
            .find(|s| s.session_number == session_number)
            .ok_or_else(|| {
                AppError::not_found(format!("session {session_number} not found on booking"))
            })?;
        session.status = SessionStatus::Completed;

        if !self
            .db
            .update_booking_sessions(booking_id, &booking.sessions)
            .await?
        {
            return Err(AppError::conflict("booking no longer accepts session changes"));
        }

        if booking.all_sessions_completed() {
            let ttl = chrono::Duration::from_std(self.config.otp_ttl)
                .map_err(|e| AppError::internal(format!("invalid otp ttl: {e}")))?;
            let otp = generate_otp(self.config.otp_length, ttl);

            let armed = self
                .db
                .mark_ready_for_completion(booking_id, &otp.hash, otp.expires_at)
                .await?;

            if armed {
                if let Some(client) = self.db.get_client(booking.client_id).await? {
                    if let Err(err) = self
                        .otp_delivery
                        .deliver_otp(&client.contact_email, &otp.code)
                        .await
                    {
                        tracing::error!(
                            booking_id = %booking_id,
                            error = %err,
                            "otp delivery failed; code remains stored"
                        );
                    }
                }
                self.notify_client(
                    &booking,
                    NotificationTemplate::BookingReadyForCompletion,
                    json!({ "booking_id": booking_id }),
                )
                .await;
            }
        }

        self.require_booking(booking_id).await
    }

    /// Close a booking with the client's OTP
    ///
    /// # Errors
    ///
    /// `Conflict` when the booking is not ready for completion (including a
    /// repeat call after success), `Unauthorized` on OTP mismatch or expiry.
    pub async fn complete_booking(&self, booking_id: Uuid, otp: &str) -> AppResult<Booking> {
        let booking = self.require_booking(booking_id).await?;

        if booking.status != BookingStatus::ReadyForCompletion {
            return Err(AppError::conflict(format!(
                "booking is {} and cannot be completed",
                booking.status
            )));
        }

        let (hash, expires_at) = match (&booking.otp_hash, booking.otp_expires_at) {
            (Some(hash), Some(expires_at)) => (hash.clone(), expires_at),
            _ => return Err(AppError::internal("ready booking is missing its otp")),
        };
        verify_otp(otp, &hash, expires_at, Utc::now())?;

        let completed_at = Utc::now();
        if !self
            .db
            .mark_booking_completed(
                booking_id,
                completed_at,
                booking.artist_id,
                booking.pricing.artist_earning,
            )
            .await?
        {
            // Raced with another completion
            return Err(AppError::conflict("booking was already completed"));
        }

        // Funds release is signalled after the local commit; the gateway
        // retries payouts on its side, so a failure here is logged only.
        // Without a gateway reference there is nothing to release against.
        match &booking.payment_ref {
            Some(payment_ref) => {
                if let Err(err) = self
                    .gateway
                    .release_payout(payment_ref, booking.pricing.artist_earning)
                    .await
                {
                    tracing::error!(booking_id = %booking_id, error = %err, "payout signal failed");
                }
            }
            None => {
                tracing::warn!(
                    booking_id = %booking_id,
                    "booking completed without a payment reference; payout signal skipped"
                );
            }
        }

        tracing::info!(booking_id = %booking_id, "booking completed");

        self.notify_client(
            &booking,
            NotificationTemplate::BookingCompleted,
            json!({ "booking_id": booking_id }),
        )
        .await;

        self.require_booking(booking_id).await
    }

    /// Cancel a booking from any pre-completion state
    ///
    /// # Errors
    ///
    /// `Conflict` from `ReadyForCompletion` or a terminal state.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor: CancelActor,
    ) -> AppResult<Booking> {
        let booking = self.require_booking(booking_id).await?;

        if !booking.status.can_cancel() {
            return Err(AppError::conflict(format!(
                "booking is {} and cannot be cancelled",
                booking.status
            )));
        }

        if !self
            .db
            .mark_booking_cancelled(booking_id, Utc::now(), actor)
            .await?
        {
            return Err(AppError::conflict("booking was already cancelled"));
        }

        if booking.payment_status.is_captured() {
            if let Some(payment_ref) = &booking.payment_ref {
                if let Err(err) = self.gateway.refund_charge(payment_ref).await {
                    tracing::error!(
                        booking_id = %booking_id,
                        error = %err,
                        "refund signal failed; gateway webhook will reconcile"
                    );
                }
            }
        }

        tracing::info!(booking_id = %booking_id, actor = actor.as_str(), "booking cancelled");

        self.notify_client(
            &booking,
            NotificationTemplate::BookingCancelled,
            json!({ "booking_id": booking_id, "cancelled_by": actor.as_str() }),
        )
        .await;

        self.require_booking(booking_id).await
    }

    /// Remove a session while the booking is still open
    ///
    /// # Errors
    ///
    /// `Conflict` once the booking is completed or cancelled, `NotFound` for
    /// an unknown session.
    pub async fn delete_session(
        &self,
        booking_id: Uuid,
        session_number: u32,
    ) -> AppResult<Booking> {
        let mut booking = self.require_booking(booking_id).await?;

        if booking.status.is_terminal() {
            return Err(AppError::conflict(format!(
                "sessions cannot be deleted from a {} booking",
                booking.status
            )));
        }

        let before = booking.sessions.len();
        booking.sessions.retain(|s| s.session_number != session_number);
        if booking.sessions.len() == before {
            return Err(AppError::not_found(format!(
                "session {session_number} not found on booking"
            )));
        }

        if !self
            .db
            .update_booking_sessions(booking_id, &booking.sessions)
            .await?
        {
            return Err(AppError::conflict("booking no longer accepts session changes"));
        }

        self.require_booking(booking_id).await
    }

    /// Leave a review on a completed booking
    ///
    /// # Errors
    ///
    /// `Unauthorized` for anyone but the booking client, `BadRequest` for a
    /// rating outside 1-5, `Conflict` when the booking is not completed or
    /// already reviewed.
    pub async fn add_review(
        &self,
        booking_id: Uuid,
        client_id: Uuid,
        rating: u8,
        text: Option<String>,
    ) -> AppResult<Booking> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::bad_request("rating must be between 1 and 5"));
        }

        let booking = self.require_booking(booking_id).await?;
        if booking.client_id != client_id {
            return Err(AppError::unauthorized(
                "only the booking client can leave a review",
            ));
        }

        let review = Review {
            rating,
            text,
            created_at: Utc::now(),
        };
        if !self.db.set_booking_review(booking_id, &review).await? {
            return Err(AppError::conflict(
                "booking is not completed or was already reviewed",
            ));
        }

        self.require_booking(booking_id).await
    }

    async fn require_booking(&self, booking_id: Uuid) -> AppResult<Booking> {
        self.db
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("booking {booking_id} not found")))
    }

    /// Reject session dates the artist's schedule rules out
    ///
    /// An artist without a stored schedule has not constrained their calendar
    /// yet; only artists with a schedule row are enforced.
    async fn check_artist_availability(
        &self,
        artist_id: Uuid,
        date: NaiveDate,
        start_minute: u16,
        end_minute: u16,
    ) -> AppResult<()> {
        let Some(schedule) = self.db.get_schedule(artist_id).await? else {
            return Ok(());
        };

        if let Some(off) = schedule.off_days {
            if off.start_date <= date && date <= off.end_date {
                return Err(AppError::conflict(format!(
                    "artist is off between {} and {}",
                    off.start_date, off.end_date
                )));
            }
        }

        let day = schedule.weekly.day(crate::models::WeekDay::of(date));
        if day.off {
            return Err(AppError::conflict(format!(
                "artist does not work on {}",
                crate::models::WeekDay::of(date)
            )));
        }
        if let (Some(open), Some(close)) = (day.start_minute, day.end_minute) {
            if start_minute < open || end_minute > close {
                return Err(AppError::conflict(
                    "session falls outside the artist's working hours",
                ));
            }
        }

        Ok(())
    }

    /// Notify the booking's client; never fails the calling transition
    ///
    /// The transition this accompanies has already committed, so even a
    /// failing client lookup is logged rather than surfaced.
    async fn notify_client(
        &self,
        booking: &Booking,
        template: NotificationTemplate,
        data: serde_json::Value,
    ) {
        match self.db.get_client(booking.client_id).await {
            Ok(Some(client)) => self.dispatch(client.contact_email, template, data),
            Ok(None) => {
                tracing::warn!(
                    booking_id = %booking.id,
                    client_id = %booking.client_id,
                    "client not found; notification skipped"
                );
            }
            Err(err) => {
                tracing::error!(
                    booking_id = %booking.id,
                    error = %err,
                    "client lookup failed; notification skipped"
                );
            }
        }
    }

    /// Fire-and-forget fan-out across the configured channels
    fn dispatch(&self, recipient: String, template: NotificationTemplate, data: serde_json::Value) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let channels = self.config.notification_channels.clone();
        tokio::spawn(async move {
            fan_out(dispatcher.as_ref(), &channels, &recipient, template, &data).await;
        });
    }
}
