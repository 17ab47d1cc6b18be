// ABOUTME: SQLite storage layer for bookings, schedules, guest spots, boosts, and profiles
// ABOUTME: Inline migrations, runtime sqlx queries, and state-guarded transition updates
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Database Management
//!
//! All calendar dates are stored as `YYYY-MM-DD` text, timestamps as RFC 3339
//! text. Embedded collections (sessions, weekly days, boost snapshots,
//! locations) are JSON columns; sessions in particular are owned by their
//! booking row and never addressable on their own.
//!
//! State transitions are expressed as guarded `UPDATE ... WHERE status = ?`
//! statements returning whether a row changed, which keeps concurrent
//! webhook/sweeper/user mutations last-write-wins safe.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::{
    ArtistBoost, ArtistProfile, ArtistSchedule, Booking, BookingStatus, BoostPaymentStatus,
    BoostSnapshot, CancelActor, ClientProfile, CurrentLocation, GeoPoint, GuestSpot, OffDays,
    PaymentStatus, PriceBreakdown, ServiceOffering, Session, TimeWindow, WeeklySchedule,
};

const DATE_FMT: &str = "%Y-%m-%d";

/// Database manager for the marketplace core
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or migration fails.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_string()
        };

        let pool = SqlitePool::connect(&connection_options).await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if a DDL statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS artists (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                contact_email TEXT NOT NULL,
                earnings REAL NOT NULL DEFAULT 0,
                current_location TEXT,
                boost TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS clients (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                contact_email TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS services (
                id TEXT PRIMARY KEY,
                artist_id TEXT NOT NULL,
                name TEXT NOT NULL,
                price REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS bookings (
                id TEXT PRIMARY KEY,
                artist_id TEXT NOT NULL,
                client_id TEXT NOT NULL,
                service_id TEXT NOT NULL,
                preferred_start TEXT NOT NULL,
                preferred_end TEXT NOT NULL,
                sessions TEXT NOT NULL,
                status TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                price REAL NOT NULL,
                gateway_fee REAL NOT NULL,
                platform_fee REAL NOT NULL,
                artist_earning REAL NOT NULL,
                payment_ref TEXT,
                otp_hash TEXT,
                otp_expires_at TEXT,
                cancelled_at TEXT,
                cancelled_by TEXT,
                review TEXT,
                created_at TEXT NOT NULL,
                completed_at TEXT
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookings_artist ON bookings(artist_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bookings_status ON bookings(status)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS booking_preferences (
                booking_id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL,
                preferred_start TEXT NOT NULL,
                preferred_end TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS schedules (
                artist_id TEXT PRIMARY KEY,
                days TEXT NOT NULL,
                off_start TEXT,
                off_end TEXT,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS guest_spots (
                id TEXT PRIMARY KEY,
                artist_id TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                start_minute INTEGER NOT NULL,
                end_minute INTEGER NOT NULL,
                off_start TEXT,
                off_end TEXT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                label TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_guest_spots_artist ON guest_spots(artist_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS boosts (
                id TEXT PRIMARY KEY,
                artist_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                payment_status TEXT NOT NULL,
                checkout_session_id TEXT,
                is_active BOOLEAN NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_boosts_active ON boosts(is_active, end_time)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ================================
    // Profiles
    // ================================

    /// Create an artist profile
    pub async fn create_artist(&self, artist: &ArtistProfile) -> AppResult<Uuid> {
        sqlx::query(
            r"
            INSERT INTO artists (id, display_name, contact_email, earnings, current_location, boost, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(artist.id.to_string())
        .bind(&artist.display_name)
        .bind(&artist.contact_email)
        .bind(artist.earnings)
        .bind(json_opt(artist.current_location.as_ref())?)
        .bind(json_opt(artist.boost.as_ref())?)
        .bind(artist.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(artist.id)
    }

    /// Get artist by ID
    pub async fn get_artist(&self, artist_id: Uuid) -> AppResult<Option<ArtistProfile>> {
        let row = sqlx::query("SELECT * FROM artists WHERE id = ?1")
            .bind(artist_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_artist).transpose()
    }

    /// Replace the artist's embedded boost snapshot
    pub async fn update_artist_boost_snapshot(
        &self,
        artist_id: Uuid,
        snapshot: &BoostSnapshot,
    ) -> AppResult<()> {
        sqlx::query("UPDATE artists SET boost = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(snapshot)?)
            .bind(artist_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Create a client profile
    pub async fn create_client(&self, client: &ClientProfile) -> AppResult<Uuid> {
        sqlx::query(
            r"
            INSERT INTO clients (id, display_name, contact_email, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(client.id.to_string())
        .bind(&client.display_name)
        .bind(&client.contact_email)
        .bind(client.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(client.id)
    }

    /// Get client by ID
    pub async fn get_client(&self, client_id: Uuid) -> AppResult<Option<ClientProfile>> {
        let row = sqlx::query("SELECT * FROM clients WHERE id = ?1")
            .bind(client_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_client).transpose()
    }

    /// Create a service offering
    pub async fn create_service(&self, service: &ServiceOffering) -> AppResult<Uuid> {
        sqlx::query(
            r"
            INSERT INTO services (id, artist_id, name, price, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(service.id.to_string())
        .bind(service.artist_id.to_string())
        .bind(&service.name)
        .bind(service.price)
        .bind(service.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(service.id)
    }

    /// Get service by ID
    pub async fn get_service(&self, service_id: Uuid) -> AppResult<Option<ServiceOffering>> {
        let row = sqlx::query("SELECT * FROM services WHERE id = ?1")
            .bind(service_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_service).transpose()
    }

    // ================================
    // Bookings
    // ================================

    /// Create a booking together with its dependent preference record
    ///
    /// Both inserts share a transaction; either both commit or neither does.
    pub async fn create_booking(&self, booking: &Booking) -> AppResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO bookings (
                id, artist_id, client_id, service_id, preferred_start, preferred_end,
                sessions, status, payment_status,
                price, gateway_fee, platform_fee, artist_earning,
                payment_ref, otp_hash, otp_expires_at,
                cancelled_at, cancelled_by, review, created_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)
            ",
        )
        .bind(booking.id.to_string())
        .bind(booking.artist_id.to_string())
        .bind(booking.client_id.to_string())
        .bind(booking.service_id.to_string())
        .bind(booking.preferred_start.format(DATE_FMT).to_string())
        .bind(booking.preferred_end.format(DATE_FMT).to_string())
        .bind(serde_json::to_string(&booking.sessions)?)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.pricing.price)
        .bind(booking.pricing.gateway_fee)
        .bind(booking.pricing.platform_fee)
        .bind(booking.pricing.artist_earning)
        .bind(booking.payment_ref.as_deref())
        .bind(booking.otp_hash.as_deref())
        .bind(booking.otp_expires_at.map(|t| t.to_rfc3339()))
        .bind(booking.cancelled_at.map(|t| t.to_rfc3339()))
        .bind(booking.cancelled_by.map(CancelActor::as_str))
        .bind(json_opt(booking.review.as_ref())?)
        .bind(booking.created_at.to_rfc3339())
        .bind(booking.completed_at.map(|t| t.to_rfc3339()))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO booking_preferences (booking_id, client_id, preferred_start, preferred_end, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(booking.id.to_string())
        .bind(booking.client_id.to_string())
        .bind(booking.preferred_start.format(DATE_FMT).to_string())
        .bind(booking.preferred_end.format(DATE_FMT).to_string())
        .bind(booking.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking.id)
    }

    /// Get booking by ID
    pub async fn get_booking(&self, booking_id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = ?1")
            .bind(booking_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_booking).transpose()
    }

    /// Bookings for one artist in any of the given statuses
    pub async fn bookings_for_artist(
        &self,
        artist_id: Uuid,
        statuses: &[BookingStatus],
    ) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query("SELECT * FROM bookings WHERE artist_id = ?1")
            .bind(artist_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let mut bookings = Vec::new();
        for row in rows {
            let booking = row_to_booking(row)?;
            if statuses.contains(&booking.status) {
                bookings.push(booking);
            }
        }
        Ok(bookings)
    }

    /// State-guarded status transition; returns whether the row moved
    pub async fn transition_booking_status(
        &self,
        booking_id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE bookings SET status = ?1 WHERE id = ?2 AND status = ?3")
            .bind(to.as_str())
            .bind(booking_id.to_string())
            .bind(from.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the owned session list, refused once the booking is terminal
    pub async fn update_booking_sessions(
        &self,
        booking_id: Uuid,
        sessions: &[Session],
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET sessions = ?1
            WHERE id = ?2 AND status NOT IN ('completed', 'cancelled')
            ",
        )
        .bind(serde_json::to_string(sessions)?)
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move an in-progress booking to ready-for-completion and store the fresh OTP
    pub async fn mark_ready_for_completion(
        &self,
        booking_id: Uuid,
        otp_hash: &str,
        otp_expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET status = 'ready_for_completion', otp_hash = ?1, otp_expires_at = ?2
            WHERE id = ?3 AND status = 'in_progress'
            ",
        )
        .bind(otp_hash)
        .bind(otp_expires_at.to_rfc3339())
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Finalize a booking after OTP verification and credit the artist
    ///
    /// The status flip and the earnings credit share one transaction, so a
    /// completed booking always has its earning on the artist. Clears the OTP
    /// fields; returns false without writing anything when the booking is no
    /// longer ready for completion.
    pub async fn mark_booking_completed(
        &self,
        booking_id: Uuid,
        completed_at: DateTime<Utc>,
        artist_id: Uuid,
        artist_earning: f64,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE bookings
            SET status = 'completed', payment_status = 'paid', completed_at = ?1,
                otp_hash = NULL, otp_expires_at = NULL
            WHERE id = ?2 AND status = 'ready_for_completion'
            ",
        )
        .bind(completed_at.to_rfc3339())
        .bind(booking_id.to_string())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE artists SET earnings = earnings + ?1 WHERE id = ?2")
            .bind(artist_earning)
            .bind(artist_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Cancel a booking from one of the cancellable states
    pub async fn mark_booking_cancelled(
        &self,
        booking_id: Uuid,
        cancelled_at: DateTime<Utc>,
        cancelled_by: CancelActor,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET status = 'cancelled', cancelled_at = ?1, cancelled_by = ?2
            WHERE id = ?3 AND status IN ('pending', 'confirmed', 'in_progress')
            ",
        )
        .bind(cancelled_at.to_rfc3339())
        .bind(cancelled_by.as_str())
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Attach a client review to a completed booking
    pub async fn set_booking_review(
        &self,
        booking_id: Uuid,
        review: &crate::models::Review,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET review = ?1
            WHERE id = ?2 AND status = 'completed' AND review IS NULL
            ",
        )
        .bind(serde_json::to_string(review)?)
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ================================
    // Payment synchronization
    // ================================

    /// Record the gateway reference and authorize payment, once
    pub async fn mark_booking_authorized(
        &self,
        booking_id: Uuid,
        payment_ref: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET payment_status = 'authorized', payment_ref = ?1
            WHERE id = ?2 AND payment_status = 'pending'
            ",
        )
        .bind(payment_ref)
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Payment failed: payment status flips and the booking drops back to pending
    pub async fn mark_booking_payment_failed(&self, booking_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET payment_status = 'failed', status = 'pending'
            WHERE id = ?1 AND payment_status = 'pending'
            ",
        )
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Charge refunded: terminal payment state, booking cancelled
    pub async fn mark_booking_refunded(&self, booking_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE bookings SET payment_status = 'refunded', status = 'cancelled'
            WHERE id = ?1 AND payment_status IN ('authorized', 'paid')
            ",
        )
        .bind(booking_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ================================
    // Schedules
    // ================================

    /// Get the stored schedule for an artist
    pub async fn get_schedule(&self, artist_id: Uuid) -> AppResult<Option<ArtistSchedule>> {
        let row = sqlx::query("SELECT * FROM schedules WHERE artist_id = ?1")
            .bind(artist_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_schedule).transpose()
    }

    /// Insert or replace an artist's schedule row
    pub async fn upsert_schedule(&self, schedule: &ArtistSchedule) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO schedules (artist_id, days, off_start, off_end, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(artist_id) DO UPDATE SET
                days = excluded.days,
                off_start = excluded.off_start,
                off_end = excluded.off_end,
                updated_at = excluded.updated_at
            ",
        )
        .bind(schedule.artist_id.to_string())
        .bind(serde_json::to_string(&schedule.weekly)?)
        .bind(
            schedule
                .off_days
                .map(|w| w.start_date.format(DATE_FMT).to_string()),
        )
        .bind(
            schedule
                .off_days
                .map(|w| w.end_date.format(DATE_FMT).to_string()),
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ================================
    // Guest spots
    // ================================

    /// Create a guest spot and update the artist's current-location snapshot
    /// in one transaction
    pub async fn create_guest_spot(
        &self,
        spot: &GuestSpot,
        location: &CurrentLocation,
    ) -> AppResult<Uuid> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO guest_spots (
                id, artist_id, start_date, end_date,
                start_time, end_time, start_minute, end_minute,
                off_start, off_end, latitude, longitude, label, is_active, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ",
        )
        .bind(spot.id.to_string())
        .bind(spot.artist_id.to_string())
        .bind(spot.start_date.format(DATE_FMT).to_string())
        .bind(spot.end_date.format(DATE_FMT).to_string())
        .bind(&spot.window.start_time)
        .bind(&spot.window.end_time)
        .bind(i64::from(spot.window.start_minute))
        .bind(i64::from(spot.window.end_minute))
        .bind(
            spot.off_days
                .map(|w| w.start_date.format(DATE_FMT).to_string()),
        )
        .bind(
            spot.off_days
                .map(|w| w.end_date.format(DATE_FMT).to_string()),
        )
        .bind(spot.location.latitude)
        .bind(spot.location.longitude)
        .bind(spot.location.label.as_deref())
        .bind(spot.is_active)
        .bind(spot.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE artists SET current_location = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(location)?)
            .bind(spot.artist_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(spot.id)
    }

    /// Get guest spot by ID
    pub async fn get_guest_spot(&self, spot_id: Uuid) -> AppResult<Option<GuestSpot>> {
        let row = sqlx::query("SELECT * FROM guest_spots WHERE id = ?1")
            .bind(spot_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_guest_spot).transpose()
    }

    /// All guest spots belonging to an artist
    pub async fn guest_spots_for_artist(&self, artist_id: Uuid) -> AppResult<Vec<GuestSpot>> {
        let rows = sqlx::query(
            "SELECT * FROM guest_spots WHERE artist_id = ?1 ORDER BY start_date",
        )
        .bind(artist_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_guest_spot).collect()
    }

    /// Rewrite a guest spot and refresh the location snapshot in one transaction
    pub async fn update_guest_spot(
        &self,
        spot: &GuestSpot,
        location: &CurrentLocation,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            UPDATE guest_spots SET
                start_date = ?1, end_date = ?2,
                start_time = ?3, end_time = ?4, start_minute = ?5, end_minute = ?6,
                off_start = ?7, off_end = ?8,
                latitude = ?9, longitude = ?10, label = ?11, is_active = ?12
            WHERE id = ?13
            ",
        )
        .bind(spot.start_date.format(DATE_FMT).to_string())
        .bind(spot.end_date.format(DATE_FMT).to_string())
        .bind(&spot.window.start_time)
        .bind(&spot.window.end_time)
        .bind(i64::from(spot.window.start_minute))
        .bind(i64::from(spot.window.end_minute))
        .bind(
            spot.off_days
                .map(|w| w.start_date.format(DATE_FMT).to_string()),
        )
        .bind(
            spot.off_days
                .map(|w| w.end_date.format(DATE_FMT).to_string()),
        )
        .bind(spot.location.latitude)
        .bind(spot.location.longitude)
        .bind(spot.location.label.as_deref())
        .bind(spot.is_active)
        .bind(spot.id.to_string())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE artists SET current_location = ?1 WHERE id = ?2")
            .bind(serde_json::to_string(location)?)
            .bind(spot.artist_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// State-guarded deactivation of a guest spot
    pub async fn deactivate_guest_spot(&self, spot_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("UPDATE guest_spots SET is_active = 0 WHERE id = ?1 AND is_active = 1")
            .bind(spot_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ================================
    // Boosts
    // ================================

    /// Insert a boost row
    pub async fn create_boost(&self, boost: &ArtistBoost) -> AppResult<Uuid> {
        sqlx::query(
            r"
            INSERT INTO boosts (id, artist_id, start_time, end_time, payment_status,
                                checkout_session_id, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(boost.id.to_string())
        .bind(boost.artist_id.to_string())
        .bind(boost.start_time.to_rfc3339())
        .bind(boost.end_time.to_rfc3339())
        .bind(boost.payment_status.as_str())
        .bind(boost.checkout_session_id.as_deref())
        .bind(boost.is_active)
        .bind(boost.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(boost.id)
    }

    /// Get boost by ID
    pub async fn get_boost(&self, boost_id: Uuid) -> AppResult<Option<ArtistBoost>> {
        let row = sqlx::query("SELECT * FROM boosts WHERE id = ?1")
            .bind(boost_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(row_to_boost).transpose()
    }

    /// Whether the artist already has a live or payment-pending boost
    pub async fn has_open_boost(&self, artist_id: Uuid) -> AppResult<bool> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) as n FROM boosts
            WHERE artist_id = ?1 AND (is_active = 1 OR payment_status = 'pending')
            ",
        )
        .bind(artist_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }

    /// Confirm a boost payment, once; activates the boost
    pub async fn mark_boost_succeeded(&self, boost_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE boosts SET payment_status = 'succeeded', is_active = 1
            WHERE id = ?1 AND payment_status = 'pending'
            ",
        )
        .bind(boost_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed boost payment, once; the row stops counting as open
    pub async fn mark_boost_payment_failed(&self, boost_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE boosts SET payment_status = 'failed'
            WHERE id = ?1 AND payment_status = 'pending'
            ",
        )
        .bind(boost_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Active boosts whose end time has elapsed
    pub async fn expired_active_boosts(&self, now: DateTime<Utc>) -> AppResult<Vec<ArtistBoost>> {
        let rows = sqlx::query("SELECT * FROM boosts WHERE is_active = 1 AND end_time <= ?1")
            .bind(now.to_rfc3339())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_boost).collect()
    }

    /// State-guarded boost deactivation; returns whether the row flipped
    pub async fn deactivate_boost(&self, boost_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("UPDATE boosts SET is_active = 0 WHERE id = ?1 AND is_active = 1")
            .bind(boost_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn json_opt<T: serde::Serialize>(value: Option<&T>) -> AppResult<Option<String>> {
    value.map(serde_json::to_string).transpose().map_err(Into::into)
}

fn parse_date(s: &str) -> AppResult<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s, DATE_FMT)?)
}

fn parse_timestamp(s: &str) -> AppResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn parse_opt_date(value: Option<String>) -> AppResult<Option<NaiveDate>> {
    value.as_deref().map(parse_date).transpose()
}

fn parse_opt_timestamp(value: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

fn off_days_from_columns(
    start: Option<String>,
    end: Option<String>,
) -> AppResult<Option<OffDays>> {
    match (parse_opt_date(start)?, parse_opt_date(end)?) {
        (Some(start_date), Some(end_date)) => Ok(Some(OffDays {
            start_date,
            end_date,
        })),
        _ => Ok(None),
    }
}

fn minute_column(value: i64, column: &str) -> AppResult<u16> {
    u16::try_from(value)
        .map_err(|_| AppError::database(format!("{column} out of minute range: {value}")))
}

fn row_to_artist(row: sqlx::sqlite::SqliteRow) -> AppResult<ArtistProfile> {
    let id_str: String = row.try_get("id")?;
    let current_location: Option<String> = row.try_get("current_location")?;
    let boost: Option<String> = row.try_get("boost")?;
    let created_at_str: String = row.try_get("created_at")?;

    Ok(ArtistProfile {
        id: Uuid::parse_str(&id_str)?,
        display_name: row.try_get("display_name")?,
        contact_email: row.try_get("contact_email")?,
        earnings: row.try_get("earnings")?,
        current_location: current_location
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        boost: boost.as_deref().map(serde_json::from_str).transpose()?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_client(row: sqlx::sqlite::SqliteRow) -> AppResult<ClientProfile> {
    let id_str: String = row.try_get("id")?;
    let created_at_str: String = row.try_get("created_at")?;

    Ok(ClientProfile {
        id: Uuid::parse_str(&id_str)?,
        display_name: row.try_get("display_name")?,
        contact_email: row.try_get("contact_email")?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_service(row: sqlx::sqlite::SqliteRow) -> AppResult<ServiceOffering> {
    let id_str: String = row.try_get("id")?;
    let artist_id_str: String = row.try_get("artist_id")?;
    let created_at_str: String = row.try_get("created_at")?;

    Ok(ServiceOffering {
        id: Uuid::parse_str(&id_str)?,
        artist_id: Uuid::parse_str(&artist_id_str)?,
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_booking(row: sqlx::sqlite::SqliteRow) -> AppResult<Booking> {
    let id_str: String = row.try_get("id")?;
    let artist_id_str: String = row.try_get("artist_id")?;
    let client_id_str: String = row.try_get("client_id")?;
    let service_id_str: String = row.try_get("service_id")?;
    let preferred_start: String = row.try_get("preferred_start")?;
    let preferred_end: String = row.try_get("preferred_end")?;
    let sessions_json: String = row.try_get("sessions")?;
    let status_str: String = row.try_get("status")?;
    let payment_status_str: String = row.try_get("payment_status")?;
    let otp_expires_at: Option<String> = row.try_get("otp_expires_at")?;
    let cancelled_at: Option<String> = row.try_get("cancelled_at")?;
    let cancelled_by: Option<String> = row.try_get("cancelled_by")?;
    let review: Option<String> = row.try_get("review")?;
    let created_at_str: String = row.try_get("created_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(Booking {
        id: Uuid::parse_str(&id_str)?,
        artist_id: Uuid::parse_str(&artist_id_str)?,
        client_id: Uuid::parse_str(&client_id_str)?,
        service_id: Uuid::parse_str(&service_id_str)?,
        preferred_start: parse_date(&preferred_start)?,
        preferred_end: parse_date(&preferred_end)?,
        sessions: serde_json::from_str(&sessions_json)?,
        status: status_str.parse::<BookingStatus>()?,
        payment_status: payment_status_str.parse::<PaymentStatus>()?,
        pricing: PriceBreakdown {
            price: row.try_get("price")?,
            gateway_fee: row.try_get("gateway_fee")?,
            platform_fee: row.try_get("platform_fee")?,
            artist_earning: row.try_get("artist_earning")?,
        },
        payment_ref: row.try_get("payment_ref")?,
        otp_hash: row.try_get("otp_hash")?,
        otp_expires_at: parse_opt_timestamp(otp_expires_at)?,
        cancelled_at: parse_opt_timestamp(cancelled_at)?,
        cancelled_by: cancelled_by
            .as_deref()
            .map(str::parse::<CancelActor>)
            .transpose()?,
        review: review.as_deref().map(serde_json::from_str).transpose()?,
        created_at: parse_timestamp(&created_at_str)?,
        completed_at: parse_opt_timestamp(completed_at)?,
    })
}

fn row_to_schedule(row: sqlx::sqlite::SqliteRow) -> AppResult<ArtistSchedule> {
    let artist_id_str: String = row.try_get("artist_id")?;
    let days_json: String = row.try_get("days")?;
    let off_start: Option<String> = row.try_get("off_start")?;
    let off_end: Option<String> = row.try_get("off_end")?;

    Ok(ArtistSchedule {
        artist_id: Uuid::parse_str(&artist_id_str)?,
        weekly: serde_json::from_str::<WeeklySchedule>(&days_json)?,
        off_days: off_days_from_columns(off_start, off_end)?,
    })
}

fn row_to_guest_spot(row: sqlx::sqlite::SqliteRow) -> AppResult<GuestSpot> {
    let id_str: String = row.try_get("id")?;
    let artist_id_str: String = row.try_get("artist_id")?;
    let start_date: String = row.try_get("start_date")?;
    let end_date: String = row.try_get("end_date")?;
    let start_minute: i64 = row.try_get("start_minute")?;
    let end_minute: i64 = row.try_get("end_minute")?;
    let off_start: Option<String> = row.try_get("off_start")?;
    let off_end: Option<String> = row.try_get("off_end")?;
    let created_at_str: String = row.try_get("created_at")?;

    Ok(GuestSpot {
        id: Uuid::parse_str(&id_str)?,
        artist_id: Uuid::parse_str(&artist_id_str)?,
        start_date: parse_date(&start_date)?,
        end_date: parse_date(&end_date)?,
        window: TimeWindow {
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            start_minute: minute_column(start_minute, "start_minute")?,
            end_minute: minute_column(end_minute, "end_minute")?,
        },
        off_days: off_days_from_columns(off_start, off_end)?,
        location: GeoPoint {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
            label: row.try_get("label")?,
        },
        is_active: row.try_get("is_active")?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

fn row_to_boost(row: sqlx::sqlite::SqliteRow) -> AppResult<ArtistBoost> {
    let id_str: String = row.try_get("id")?;
    let artist_id_str: String = row.try_get("artist_id")?;
    let start_time: String = row.try_get("start_time")?;
    let end_time: String = row.try_get("end_time")?;
    let payment_status: String = row.try_get("payment_status")?;
    let created_at_str: String = row.try_get("created_at")?;

    Ok(ArtistBoost {
        id: Uuid::parse_str(&id_str)?,
        artist_id: Uuid::parse_str(&artist_id_str)?,
        start_time: parse_timestamp(&start_time)?,
        end_time: parse_timestamp(&end_time)?,
        payment_status: payment_status.parse::<BoostPaymentStatus>()?,
        checkout_session_id: row.try_get("checkout_session_id")?,
        is_active: row.try_get("is_active")?,
        created_at: parse_timestamp(&created_at_str)?,
    })
}
