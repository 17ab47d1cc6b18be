// ABOUTME: Integration tests for file-backed database persistence
// ABOUTME: Schema creation on first open and durability of rows across reopens
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

mod common;

use common::{booking_fixture, date, init_test_logging, seed_artist, seed_client, seed_service};
use inkmarket::database::Database;
use inkmarket::models::BookingStatus;

#[tokio::test]
async fn rows_survive_a_reopen() {
    init_test_logging();
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite:{}", dir.path().join("inkmarket.db").display());

    let (artist_id, booking_id) = {
        let db = Database::new(&url).await.expect("first open creates the file");
        let artist = seed_artist(&db).await;
        let client = seed_client(&db).await;
        let service = seed_service(&db, artist.id, 250.0).await;
        let booking = booking_fixture(
            artist.id,
            client.id,
            service.id,
            BookingStatus::Confirmed,
            date(2025, 6, 1),
            date(2025, 6, 10),
        );
        db.create_booking(&booking).await.expect("booking insert");
        (artist.id, booking.id)
    };

    let db = Database::new(&url).await.expect("reopen");
    let artist = db.get_artist(artist_id).await.unwrap().expect("artist kept");
    assert_eq!(artist.display_name, "Vera Moth");

    let booking = db.get_booking(booking_id).await.unwrap().expect("booking kept");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.preferred_end, date(2025, 6, 10));
}
