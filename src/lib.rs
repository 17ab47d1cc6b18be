// ABOUTME: Main library entry point for the Inkmarket marketplace core
// ABOUTME: Booking lifecycle, scheduling, guest spots, payment sync, and boosts
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Inkmarket Core
//!
//! The domain core of a tattoo-service marketplace: clients book artists for
//! multi-session work, artists manage weekly availability, time off, and
//! temporary guest-spot relocations, and an asynchronous payment gateway
//! drives payment state.
//!
//! ## Components
//!
//! - **Booking Engine** ([`bookings`]): owns the booking status state machine
//!   and every session mutation, up to OTP-gated completion.
//! - **Availability Manager** ([`availability`]): weekly recurring schedules
//!   and the single active off-day window, conflict-checked against bookings.
//! - **Guest Spot Scheduler** ([`guest_spots`]): temporary relocation windows
//!   with booking and date-range conflict checks.
//! - **Payment Synchronizer** ([`payments`]): idempotent handlers for gateway
//!   checkout/failure/refund events.
//! - **Boosts** ([`boosts`]): paid profile promotion with a periodic expiry
//!   sweeper.
//!
//! All external surfaces (HTTP, notification transports, the gateway wire
//! protocol, OTP delivery) live behind traits; the core is one deployable of
//! in-process calls.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use inkmarket::config::CoreConfig;
//! use inkmarket::database::Database;
//! use inkmarket::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = CoreConfig::from_env();
//!     let db = Arc::new(Database::new(&config.database_url).await?);
//!     println!("store ready at {}", config.database_url);
//!     Ok(())
//! }
//! ```

/// Weekly availability normalization and off-day windows
pub mod availability;
/// Booking lifecycle engine
pub mod bookings;
/// Boost checkout and expiry sweeping
pub mod boosts;
/// Environment-driven configuration
pub mod config;
/// SQLite storage layer
pub mod database;
/// Unified error handling
pub mod errors;
/// Guest spot scheduling
pub mod guest_spots;
/// Tracing initialization
pub mod logging;
/// Domain models
pub mod models;
/// Notification dispatch seam
pub mod notifications;
/// Completion OTP gate
pub mod otp;
/// Payment gateway seam and event synchronizer
pub mod payments;
