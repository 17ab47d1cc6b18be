// ABOUTME: Profile boost checkout with gateway compensation and the expiry sweeper
// ABOUTME: Boosts stay payment-pending until a confirmed gateway event activates them
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Boosts & Expiry Sweeper
//!
//! Starting a boost opens a gateway checkout session first and then inserts
//! the local row; if the insert fails the session is cancelled so no orphaned
//! checkout survives. The boost activates only when the payment synchronizer
//! sees the confirmed gateway event.
//!
//! The sweeper runs on a fixed interval and deactivates every active boost
//! whose end time has elapsed, mirroring the flip onto the owning artist's
//! embedded snapshot. Each record is handled independently; one failure never
//! aborts the rest.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{ArtistBoost, BoostPaymentStatus};
use crate::payments::{CheckoutSession, PaymentGateway};

/// Boost checkout manager
#[derive(Clone)]
pub struct BoostManager {
    db: Arc<Database>,
    gateway: Arc<dyn PaymentGateway>,
}

impl BoostManager {
    /// Wire the manager to its store and gateway
    #[must_use]
    pub fn new(db: Arc<Database>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { db, gateway }
    }

    /// Open a boost checkout for an artist
    ///
    /// The returned boost is payment-pending and inactive until the gateway
    /// confirms; the checkout URL is what the client is sent to.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown artist, `Conflict` when the artist already
    /// has a live or payment-pending boost, `Internal` when the local write
    /// fails after the checkout session was created (the session is cancelled
    /// as compensation).
    pub async fn start_boost(
        &self,
        artist_id: Uuid,
        duration: chrono::Duration,
        price: f64,
    ) -> AppResult<(ArtistBoost, CheckoutSession)> {
        self.db
            .get_artist(artist_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("artist {artist_id} not found")))?;

        if self.db.has_open_boost(artist_id).await? {
            return Err(AppError::conflict("artist already has an open boost"));
        }

        let boost_id = Uuid::new_v4();
        let session = self
            .gateway
            .create_checkout_session(price, &format!("boost:{boost_id}"))
            .await?;

        let now = Utc::now();
        let boost = ArtistBoost {
            id: boost_id,
            artist_id,
            start_time: now,
            end_time: now + duration,
            payment_status: BoostPaymentStatus::Pending,
            checkout_session_id: Some(session.id.clone()),
            is_active: false,
            created_at: now,
        };

        if let Err(err) = self.db.create_boost(&boost).await {
            // Compensate: do not leave a payable session behind
            if let Err(cancel_err) = self.gateway.cancel_checkout_session(&session.id).await {
                tracing::error!(
                    boost_id = %boost_id,
                    error = %cancel_err,
                    "failed to cancel checkout session during compensation"
                );
            }
            return Err(AppError::internal(format!(
                "boost creation failed after checkout was opened: {err}"
            )));
        }

        tracing::info!(boost_id = %boost_id, artist_id = %artist_id, "boost checkout opened");
        Ok((boost, session))
    }
}

/// Deactivate every active boost whose end time has elapsed
///
/// Returns how many boosts were flipped. Per-record failures are logged and
/// skipped; an empty result set is a no-op.
pub async fn sweep_once(db: &Database, now: DateTime<Utc>) -> usize {
    let expired = match db.expired_active_boosts(now).await {
        Ok(expired) => expired,
        Err(err) => {
            tracing::error!(error = %err, "boost sweep query failed");
            return 0;
        }
    };

    let mut swept = 0;
    for boost in expired {
        match deactivate_with_snapshot(db, &boost).await {
            Ok(true) => swept += 1,
            Ok(false) => {
                tracing::debug!(boost_id = %boost.id, "boost already deactivated; skipping");
            }
            Err(err) => {
                tracing::error!(boost_id = %boost.id, error = %err, "boost deactivation failed");
            }
        }
    }

    if swept > 0 {
        tracing::info!(swept, "boost sweep deactivated expired boosts");
    }
    swept
}

async fn deactivate_with_snapshot(db: &Database, boost: &ArtistBoost) -> AppResult<bool> {
    if !db.deactivate_boost(boost.id).await? {
        return Ok(false);
    }

    let mut snapshot = boost.snapshot();
    snapshot.is_active = false;
    db.update_artist_boost_snapshot(boost.artist_id, &snapshot)
        .await?;
    Ok(true)
}

/// Periodic boost expiry sweeper with a shutdown channel
pub struct BoostSweeper {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl BoostSweeper {
    /// Spawn the sweep loop on the given interval
    #[must_use]
    pub fn start(db: Arc<Database>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        sweep_once(&db, Utc::now()).await;
                    }
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("boost sweeper received shutdown signal");
                        break;
                    }
                }
            }
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Signal the loop to stop and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.handle.await;
    }
}
