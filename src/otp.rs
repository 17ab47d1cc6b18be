// ABOUTME: One-time completion code generation and verification
// ABOUTME: Numeric OTPs hashed with SHA-256 and gated by a stored expiry timestamp
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Completion OTP Gate
//!
//! Booking completion is authorized by a numeric code held by the client. Only
//! the SHA-256 hex digest is stored; verification recomputes the digest and
//! compares it against the stored hash before checking expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

use crate::errors::{AppError, AppResult};

/// Delivery seam for handing the plain OTP to the client
///
/// Delivery failure never rolls back OTP generation; callers log and move on.
#[async_trait]
pub trait OtpDelivery: Send + Sync {
    /// Send `code` to the client's contact address
    async fn deliver_otp(&self, contact: &str, code: &str) -> AppResult<()>;
}

/// A freshly generated OTP together with its storage form
#[derive(Debug, Clone)]
pub struct OtpData {
    /// The plain code handed to the delivery collaborator
    pub code: String,
    /// SHA-256 hex digest stored on the booking
    pub hash: String,
    /// Moment the code stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Generate a numeric OTP of `length` digits valid for `ttl`
#[must_use]
pub fn generate_otp(length: usize, ttl: chrono::Duration) -> OtpData {
    let mut rng = thread_rng();
    let code: String = (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();

    OtpData {
        hash: hash_otp(&code),
        expires_at: Utc::now() + ttl,
        code,
    }
}

/// Hash an OTP for storage or comparison
#[must_use]
pub fn hash_otp(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Verify a presented code against the stored hash and expiry
///
/// # Errors
///
/// Returns `Unauthorized` on hash mismatch or when `now` is past `expires_at`.
pub fn verify_otp(
    presented: &str,
    stored_hash: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if now > expires_at {
        return Err(AppError::unauthorized("completion code has expired"));
    }
    if hash_otp(presented) != stored_hash {
        return Err(AppError::unauthorized("completion code does not match"));
    }
    Ok(())
}
