// ABOUTME: Unified error handling for the Inkmarket core
// ABOUTME: Defines error codes, the AppError type, and HTTP status mapping
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Unified Error Handling
//!
//! Every fallible operation in the core returns [`AppResult`]. The taxonomy is
//! deliberately small: business-rule violations map onto one of the codes
//! below, storage failures become [`ErrorCode::DatabaseError`], and anything
//! unexpected from a downstream collaborator is wrapped as
//! [`ErrorCode::InternalError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Referenced entity (artist, client, service, booking, schedule, guest spot, boost) is missing
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// Malformed input: inverted ranges, unparseable times, missing fields, invalid state for the mutation
    #[serde(rename = "BAD_REQUEST")]
    BadRequest,
    /// Scheduling or state-machine conflict: overlaps, duplicate guest spots, transitions out of order
    #[serde(rename = "CONFLICT")]
    Conflict,
    /// OTP mismatch/expiry or a role not allowed to perform the operation
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
    /// Mutation of an immutable past record
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
    /// Storage layer failure
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    /// Unexpected downstream failure, possibly after compensation
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Conflict => 409,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::DatabaseError | Self::InternalError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NotFound => "The requested resource was not found",
            Self::BadRequest => "The provided input is invalid",
            Self::Conflict => "The request conflicts with the current state",
            Self::Unauthorized => "The caller is not authorized for this operation",
            Self::Forbidden => "The record can no longer be modified",
            Self::DatabaseError => "Database operation failed",
            Self::InternalError => "An internal error occurred",
        }
    }
}

/// Unified error type for the application
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Missing artist/client/service/booking/schedule/guest-spot/boost
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, resource)
    }

    /// Malformed or invalid input
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Scheduling/booking overlap or out-of-order transition
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// OTP mismatch/expiry or disallowed role
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Mutating an immutable past record
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Storage failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Unexpected downstream failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(err.to_string()).with_source(err)
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        Self::database(format!("malformed id column: {err}")).with_source(err)
    }
}

impl From<chrono::ParseError> for AppError {
    fn from(err: chrono::ParseError) -> Self {
        Self::database(format!("malformed timestamp column: {err}")).with_source(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("serialization failed: {err}")).with_source(err)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
