// ABOUTME: Integration tests for the booking lifecycle state machine
// ABOUTME: Creation, confirmation, sessions, OTP-gated completion, cancellation, reviews
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod common;

use common::{create_test_harness, date, seed_artist, seed_client, seed_service};
use inkmarket::availability::{AvailabilityManager, DayPatch, WeeklyPatch};
use inkmarket::bookings::SessionInput;
use inkmarket::errors::ErrorCode;
use inkmarket::models::{BookingStatus, CancelActor, PaymentStatus, SessionStatus, WeekDay};
use uuid::Uuid;

#[tokio::test]
async fn creation_validates_references_and_range() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 400.0).await;

    let err = h
        .engine
        .create_booking(client.id, Uuid::new_v4(), date(2025, 6, 1), date(2025, 6, 5))
        .await
        .expect_err("unknown service");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = h
        .engine
        .create_booking(Uuid::new_v4(), service.id, date(2025, 6, 1), date(2025, 6, 5))
        .await
        .expect_err("unknown client");
    assert_eq!(err.code, ErrorCode::NotFound);

    let err = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 5), date(2025, 6, 1))
        .await
        .expect_err("inverted range");
    assert_eq!(err.code, ErrorCode::BadRequest);

    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 1), date(2025, 6, 5))
        .await
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert!((booking.pricing.price - 400.0).abs() < 1e-9);
    assert!(booking.pricing.artist_earning < booking.pricing.price);
}

#[tokio::test]
async fn confirmation_is_artist_only_and_single_shot() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 400.0).await;
    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 1), date(2025, 6, 5))
        .await
        .unwrap();

    let err = h
        .engine
        .confirm_booking(booking.id, Uuid::new_v4())
        .await
        .expect_err("stranger cannot confirm");
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let confirmed = h.engine.confirm_booking(booking.id, artist.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let err = h
        .engine
        .confirm_booking(booking.id, artist.id)
        .await
        .expect_err("already confirmed");
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn full_lifecycle_completes_exactly_once_with_otp() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 500.0).await;
    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 9), date(2025, 6, 20))
        .await
        .unwrap();
    h.engine.confirm_booking(booking.id, artist.id).await.unwrap();
    assert!(h
        .db
        .mark_booking_authorized(booking.id, "pi_lifecycle")
        .await
        .unwrap());

    // Sessions cannot be scheduled before confirmation; verify the inverse is
    // now possible and advances to in-progress
    let after_first = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "2:00 pm".into(),
                end_time: "3:00 pm".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(after_first.status, BookingStatus::InProgress);
    assert_eq!(after_first.sessions[0].status, SessionStatus::Scheduled);
    assert_eq!(after_first.sessions[0].start_minute, 840);

    let after_second = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 2,
                date: date(2025, 6, 12),
                start_time: "1:00 pm".into(),
                end_time: "4:00 pm".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(after_second.sessions.len(), 2);

    // Moving an existing session marks it rescheduled
    let moved = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 2,
                date: date(2025, 6, 13),
                start_time: "1:00 pm".into(),
                end_time: "4:00 pm".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.session(2).unwrap().status, SessionStatus::Rescheduled);
    assert_eq!(moved.session(2).unwrap().date, date(2025, 6, 13));

    // Completing only one session does not arm the gate
    let partial = h.engine.complete_session(booking.id, 1).await.unwrap();
    assert_eq!(partial.status, BookingStatus::InProgress);
    assert!(h.otp_delivery.last_code().is_none());

    // Completing the last session arms the OTP gate
    let ready = h.engine.complete_session(booking.id, 2).await.unwrap();
    assert_eq!(ready.status, BookingStatus::ReadyForCompletion);
    assert!(ready.otp_hash.is_some());
    let code = h.otp_delivery.last_code().expect("otp handed to delivery");

    // Wrong code is unauthorized and changes nothing
    let err = h
        .engine
        .complete_booking(booking.id, "not-the-code")
        .await
        .expect_err("wrong otp");
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let completed = h.engine.complete_booking(booking.id, &code).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(completed.payment_status, PaymentStatus::Paid);
    assert!(completed.completed_at.is_some());
    assert!(completed.otp_hash.is_none());

    // Earning landed on the artist and the payout was signalled against the
    // gateway reference
    let artist_after = h.db.get_artist(artist.id).await.unwrap().unwrap();
    assert!((artist_after.earnings - completed.pricing.artist_earning).abs() < 1e-9);
    assert_eq!(
        h.gateway.payouts.lock().unwrap().as_slice(),
        [("pi_lifecycle".to_string(), completed.pricing.artist_earning)]
    );

    // A repeat call finds the booking out of ready state
    let err = h
        .engine
        .complete_booking(booking.id, &code)
        .await
        .expect_err("second completion");
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn completion_without_a_gateway_reference_skips_the_payout_signal() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 300.0).await;
    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 9), date(2025, 6, 20))
        .await
        .unwrap();
    h.engine.confirm_booking(booking.id, artist.id).await.unwrap();
    h.engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "2:00 pm".into(),
                end_time: "3:00 pm".into(),
            },
        )
        .await
        .unwrap();
    h.engine.complete_session(booking.id, 1).await.unwrap();
    let code = h.otp_delivery.last_code().unwrap();

    // Payment was never authorized, so there is no reference to release against
    let completed = h.engine.complete_booking(booking.id, &code).await.unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert!(h.gateway.payouts.lock().unwrap().is_empty());

    // The artist is still credited
    let artist_after = h.db.get_artist(artist.id).await.unwrap().unwrap();
    assert!((artist_after.earnings - completed.pricing.artist_earning).abs() < 1e-9);
}

#[tokio::test]
async fn completion_credits_the_artist_exactly_once() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 300.0).await;
    let mut booking = common::booking_fixture(
        artist.id,
        client.id,
        service.id,
        BookingStatus::ReadyForCompletion,
        date(2025, 6, 1),
        date(2025, 6, 10),
    );
    booking.sessions = vec![common::session_fixture(1, date(2025, 6, 5), 840, 900)];
    h.db.create_booking(&booking).await.unwrap();

    let now = chrono::Utc::now();
    assert!(h
        .db
        .mark_booking_completed(booking.id, now, artist.id, 270.0)
        .await
        .unwrap());

    // Replaying the completion flips nothing and credits nothing
    assert!(!h
        .db
        .mark_booking_completed(booking.id, now, artist.id, 270.0)
        .await
        .unwrap());

    let artist_after = h.db.get_artist(artist.id).await.unwrap().unwrap();
    assert!((artist_after.earnings - 270.0).abs() < 1e-9);
}

#[tokio::test]
async fn transitions_survive_a_missing_client_row() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let service = seed_service(&h.db, artist.id, 300.0).await;

    // Booking row pointing at a client that was never stored
    let booking = common::booking_fixture(
        artist.id,
        Uuid::new_v4(),
        service.id,
        BookingStatus::Pending,
        date(2025, 6, 1),
        date(2025, 6, 10),
    );
    h.db.create_booking(&booking).await.unwrap();

    // The notification path cannot find the client; the transition still lands
    let confirmed = h.engine.confirm_booking(booking.id, artist.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn sessions_respect_artist_availability() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 300.0).await;
    let availability = AvailabilityManager::new(h.db.clone());

    // Working Tuesdays 10:00-18:00, everything else off
    let mut patch = WeeklyPatch::new();
    patch.insert(
        WeekDay::Tuesday,
        DayPatch {
            off: false,
            start_time: Some("10:00 am".into()),
            end_time: Some("6:00 pm".into()),
        },
    );
    availability
        .update_weekly_schedule(artist.id, &patch)
        .await
        .unwrap();
    // Off 2025-06-16..2025-06-20
    availability
        .set_time_off_at(artist.id, date(2025, 6, 16), date(2025, 6, 20), date(2025, 6, 1))
        .await
        .unwrap();

    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 9), date(2025, 6, 30))
        .await
        .unwrap();

    // Scheduling against a pending booking is refused outright
    let err = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "11:00 am".into(),
                end_time: "1:00 pm".into(),
            },
        )
        .await
        .expect_err("not confirmed yet");
    assert_eq!(err.code, ErrorCode::Conflict);

    h.engine.confirm_booking(booking.id, artist.id).await.unwrap();

    // 2025-06-17 is a Tuesday inside the off-day window
    let err = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 17),
                start_time: "11:00 am".into(),
                end_time: "1:00 pm".into(),
            },
        )
        .await
        .expect_err("off-day window");
    assert_eq!(err.code, ErrorCode::Conflict);

    // 2025-06-11 is a Wednesday, weekly off
    let err = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 11),
                start_time: "11:00 am".into(),
                end_time: "1:00 pm".into(),
            },
        )
        .await
        .expect_err("weekly off day");
    assert_eq!(err.code, ErrorCode::Conflict);

    // Tuesday but past closing time
    let err = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "4:00 pm".into(),
                end_time: "7:00 pm".into(),
            },
        )
        .await
        .expect_err("outside working hours");
    assert_eq!(err.code, ErrorCode::Conflict);

    // Tuesday inside working hours is accepted
    let updated = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "11:00 am".into(),
                end_time: "1:00 pm".into(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, BookingStatus::InProgress);
}

#[tokio::test]
async fn cancellation_rules_and_refund_signal() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 300.0).await;
    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 9), date(2025, 6, 20))
        .await
        .unwrap();
    h.engine.confirm_booking(booking.id, artist.id).await.unwrap();

    // Simulate the gateway capturing the payment
    assert!(h
        .db
        .mark_booking_authorized(booking.id, "pi_test_123")
        .await
        .unwrap());

    let cancelled = h
        .engine
        .cancel_booking(booking.id, CancelActor::Client)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(CancelActor::Client));
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(
        h.gateway.refunds.lock().unwrap().as_slice(),
        ["pi_test_123".to_string()]
    );

    // Terminal: no second cancel, no session mutations
    let err = h
        .engine
        .cancel_booking(booking.id, CancelActor::Artist)
        .await
        .expect_err("already cancelled");
    assert_eq!(err.code, ErrorCode::Conflict);

    let err = h
        .engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "2:00 pm".into(),
                end_time: "3:00 pm".into(),
            },
        )
        .await
        .expect_err("cancelled booking is immutable");
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn session_deletion_is_blocked_on_terminal_bookings() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 300.0).await;
    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 9), date(2025, 6, 20))
        .await
        .unwrap();
    h.engine.confirm_booking(booking.id, artist.id).await.unwrap();
    h.engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "2:00 pm".into(),
                end_time: "3:00 pm".into(),
            },
        )
        .await
        .unwrap();

    let err = h
        .engine
        .delete_session(booking.id, 9)
        .await
        .expect_err("unknown session");
    assert_eq!(err.code, ErrorCode::NotFound);

    let trimmed = h.engine.delete_session(booking.id, 1).await.unwrap();
    assert!(trimmed.sessions.is_empty());

    h.engine
        .cancel_booking(booking.id, CancelActor::Artist)
        .await
        .unwrap();
    let err = h
        .engine
        .delete_session(booking.id, 1)
        .await
        .expect_err("terminal booking");
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn reviews_only_on_completed_bookings() {
    let h = create_test_harness().await;
    let artist = seed_artist(&h.db).await;
    let client = seed_client(&h.db).await;
    let service = seed_service(&h.db, artist.id, 300.0).await;
    let booking = h
        .engine
        .create_booking(client.id, service.id, date(2025, 6, 9), date(2025, 6, 20))
        .await
        .unwrap();

    let err = h
        .engine
        .add_review(booking.id, client.id, 5, None)
        .await
        .expect_err("not completed");
    assert_eq!(err.code, ErrorCode::Conflict);

    // Drive the booking to completion
    h.engine.confirm_booking(booking.id, artist.id).await.unwrap();
    h.engine
        .add_or_update_session(
            booking.id,
            SessionInput {
                session_number: 1,
                date: date(2025, 6, 10),
                start_time: "2:00 pm".into(),
                end_time: "3:00 pm".into(),
            },
        )
        .await
        .unwrap();
    h.engine.complete_session(booking.id, 1).await.unwrap();
    let code = h.otp_delivery.last_code().unwrap();
    h.engine.complete_booking(booking.id, &code).await.unwrap();

    let err = h
        .engine
        .add_review(booking.id, client.id, 6, None)
        .await
        .expect_err("rating out of range");
    assert_eq!(err.code, ErrorCode::BadRequest);

    let err = h
        .engine
        .add_review(booking.id, Uuid::new_v4(), 5, None)
        .await
        .expect_err("stranger cannot review");
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let reviewed = h
        .engine
        .add_review(booking.id, client.id, 5, Some("clean lines".into()))
        .await
        .unwrap();
    assert_eq!(reviewed.review.as_ref().unwrap().rating, 5);

    let err = h
        .engine
        .add_review(booking.id, client.id, 4, None)
        .await
        .expect_err("one review per booking");
    assert_eq!(err.code, ErrorCode::Conflict);
}
