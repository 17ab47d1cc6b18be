// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides database setup, profile seeding, and collaborator test doubles
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
#![allow(dead_code)]

//! Shared test setup for the `inkmarket` integration suite.

use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use inkmarket::bookings::BookingEngine;
use inkmarket::config::CoreConfig;
use inkmarket::database::Database;
use inkmarket::errors::{AppError, AppResult};
use inkmarket::models::{
    ArtistProfile, Booking, BookingStatus, ClientProfile, PaymentStatus, PriceBreakdown,
    ServiceOffering, Session, SessionStatus,
};
use inkmarket::notifications::{NotificationDispatcher, NotificationTemplate};
use inkmarket::otp::OtpDelivery;
use inkmarket::payments::{CheckoutSession, PaymentGateway};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .try_init();
    });
}

/// Standard in-memory test database
pub async fn create_test_database() -> Arc<Database> {
    init_test_logging();
    Arc::new(
        Database::new("sqlite::memory:")
            .await
            .expect("in-memory database should open"),
    )
}

/// Calendar date shorthand
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// Seed an artist profile
pub async fn seed_artist(db: &Database) -> ArtistProfile {
    let artist = ArtistProfile {
        id: Uuid::new_v4(),
        display_name: "Vera Moth".into(),
        contact_email: "vera@studio.example".into(),
        earnings: 0.0,
        current_location: None,
        boost: None,
        created_at: Utc::now(),
    };
    db.create_artist(&artist).await.expect("artist insert");
    artist
}

/// Seed a client profile
pub async fn seed_client(db: &Database) -> ClientProfile {
    let client = ClientProfile {
        id: Uuid::new_v4(),
        display_name: "Sam Ode".into(),
        contact_email: "sam@mail.example".into(),
        created_at: Utc::now(),
    };
    db.create_client(&client).await.expect("client insert");
    client
}

/// Seed a service offering for an artist
pub async fn seed_service(db: &Database, artist_id: Uuid, price: f64) -> ServiceOffering {
    let service = ServiceOffering {
        id: Uuid::new_v4(),
        artist_id,
        name: "Full sleeve".into(),
        price,
        created_at: Utc::now(),
    };
    db.create_service(&service).await.expect("service insert");
    service
}

/// Build a booking row directly, bypassing the engine, for conflict fixtures
pub fn booking_fixture(
    artist_id: Uuid,
    client_id: Uuid,
    service_id: Uuid,
    status: BookingStatus,
    preferred_start: NaiveDate,
    preferred_end: NaiveDate,
) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        artist_id,
        client_id,
        service_id,
        preferred_start,
        preferred_end,
        sessions: Vec::new(),
        status,
        payment_status: PaymentStatus::Pending,
        pricing: PriceBreakdown::from_price(300.0, 0.029, 0.10),
        payment_ref: None,
        otp_hash: None,
        otp_expires_at: None,
        cancelled_at: None,
        cancelled_by: None,
        review: None,
        created_at: Utc::now(),
        completed_at: None,
    }
}

/// A scheduled session value record for fixtures
pub fn session_fixture(session_number: u32, on: NaiveDate, start_minute: u16, end_minute: u16) -> Session {
    Session {
        session_number,
        date: on,
        start_time: format!("{}:00 pm", (start_minute / 60).saturating_sub(12).max(1)),
        end_time: format!("{}:00 pm", (end_minute / 60).saturating_sub(12).max(1)),
        start_minute,
        end_minute,
        status: SessionStatus::Scheduled,
    }
}

/// Dispatcher double recording every delivery, optionally failing one channel
#[derive(Default)]
pub struct RecordingDispatcher {
    /// (channel, recipient, template) triples in dispatch order
    pub sent: Mutex<Vec<(String, String, String)>>,
    /// Channel that always errors, for isolation tests
    pub fail_channel: Option<String>,
}

impl RecordingDispatcher {
    pub fn failing_on(channel: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_channel: Some(channel.to_string()),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("dispatcher lock").len()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(
        &self,
        channel: &str,
        recipient: &str,
        template: NotificationTemplate,
        _data: Value,
    ) -> AppResult<()> {
        if self.fail_channel.as_deref() == Some(channel) {
            return Err(AppError::internal(format!("channel {channel} is down")));
        }
        self.sent.lock().expect("dispatcher lock").push((
            channel.to_string(),
            recipient.to_string(),
            template.as_str().to_string(),
        ));
        Ok(())
    }
}

/// OTP delivery double capturing the plain code
#[derive(Default)]
pub struct RecordingOtpDelivery {
    pub delivered: Mutex<Option<(String, String)>>,
}

impl RecordingOtpDelivery {
    pub fn last_code(&self) -> Option<String> {
        self.delivered
            .lock()
            .expect("otp lock")
            .as_ref()
            .map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpDelivery for RecordingOtpDelivery {
    async fn deliver_otp(&self, contact: &str, code: &str) -> AppResult<()> {
        *self.delivered.lock().expect("otp lock") = Some((contact.to_string(), code.to_string()));
        Ok(())
    }
}

/// Gateway double recording every outbound signal
#[derive(Default)]
pub struct FakeGateway {
    pub checkouts: Mutex<Vec<(f64, String)>>,
    pub cancelled: Mutex<Vec<String>>,
    pub payouts: Mutex<Vec<(String, f64)>>,
    pub refunds: Mutex<Vec<String>>,
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        amount: f64,
        correlation: &str,
    ) -> AppResult<CheckoutSession> {
        self.checkouts
            .lock()
            .expect("gateway lock")
            .push((amount, correlation.to_string()));
        Ok(CheckoutSession {
            id: format!("cs_{correlation}"),
            url: format!("https://gateway.example/pay/{correlation}"),
        })
    }

    async fn cancel_checkout_session(&self, session_id: &str) -> AppResult<()> {
        self.cancelled
            .lock()
            .expect("gateway lock")
            .push(session_id.to_string());
        Ok(())
    }

    async fn release_payout(&self, payment_ref: &str, amount: f64) -> AppResult<()> {
        self.payouts
            .lock()
            .expect("gateway lock")
            .push((payment_ref.to_string(), amount));
        Ok(())
    }

    async fn refund_charge(&self, payment_ref: &str) -> AppResult<()> {
        self.refunds
            .lock()
            .expect("gateway lock")
            .push(payment_ref.to_string());
        Ok(())
    }
}

/// Fully wired engine plus handles on every test double
pub struct TestHarness {
    pub db: Arc<Database>,
    pub engine: BookingEngine,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub otp_delivery: Arc<RecordingOtpDelivery>,
    pub gateway: Arc<FakeGateway>,
    pub config: CoreConfig,
}

/// Standard engine setup over a fresh in-memory database
pub async fn create_test_harness() -> TestHarness {
    let db = create_test_database().await;
    let config = CoreConfig {
        notification_channels: vec!["email".into()],
        ..CoreConfig::default()
    };
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let otp_delivery = Arc::new(RecordingOtpDelivery::default());
    let gateway = Arc::new(FakeGateway::default());

    let engine = BookingEngine::new(
        Arc::clone(&db),
        config.clone(),
        dispatcher.clone() as Arc<dyn NotificationDispatcher>,
        otp_delivery.clone() as Arc<dyn OtpDelivery>,
        gateway.clone() as Arc<dyn PaymentGateway>,
    );

    TestHarness {
        db,
        engine,
        dispatcher,
        otp_delivery,
        gateway,
        config,
    }
}
