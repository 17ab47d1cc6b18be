// ABOUTME: Environment-driven configuration for the Inkmarket core
// ABOUTME: Database URL, fee split, OTP policy, and sweeper cadence with sane defaults
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment-only configuration. Every knob has a default so tests and local
//! runs work with an empty environment.

use std::env;
use std::time::Duration;

/// Runtime configuration for the marketplace core
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// SQLite connection string
    pub database_url: String,
    /// Gateway fee as a fraction of the service price
    pub gateway_fee_rate: f64,
    /// Platform fee as a fraction of the service price
    pub platform_fee_rate: f64,
    /// Number of digits in a completion OTP
    pub otp_length: usize,
    /// How long a generated OTP stays valid
    pub otp_ttl: Duration,
    /// How often the boost expiry sweeper runs
    pub boost_sweep_interval: Duration,
    /// Notification channels fanned out on payment authorization
    pub notification_channels: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            gateway_fee_rate: 0.029,
            platform_fee_rate: 0.10,
            otp_length: 6,
            otp_ttl: Duration::from_secs(10 * 60),
            boost_sweep_interval: Duration::from_secs(60),
            notification_channels: vec!["email".into(), "push".into(), "socket".into()],
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            gateway_fee_rate: parse_env("GATEWAY_FEE_RATE", defaults.gateway_fee_rate),
            platform_fee_rate: parse_env("PLATFORM_FEE_RATE", defaults.platform_fee_rate),
            otp_length: parse_env("OTP_LENGTH", defaults.otp_length),
            otp_ttl: Duration::from_secs(parse_env(
                "OTP_TTL_SECS",
                defaults.otp_ttl.as_secs(),
            )),
            boost_sweep_interval: Duration::from_secs(parse_env(
                "BOOST_SWEEP_INTERVAL_SECS",
                defaults.boost_sweep_interval.as_secs(),
            )),
            notification_channels: env::var("NOTIFICATION_CHANNELS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.notification_channels),
        }
    }
}

/// Parse an environment variable, falling back to the default on absence or parse failure
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_usable_without_environment() {
        let config = CoreConfig::default();
        assert_eq!(config.otp_length, 6);
        assert!(config.platform_fee_rate > config.gateway_fee_rate);
        assert_eq!(config.notification_channels.len(), 3);
    }

    #[test]
    #[serial]
    fn environment_overrides_apply() {
        env::set_var("OTP_LENGTH", "8");
        env::set_var("NOTIFICATION_CHANNELS", "email, push");
        let config = CoreConfig::from_env();
        env::remove_var("OTP_LENGTH");
        env::remove_var("NOTIFICATION_CHANNELS");

        assert_eq!(config.otp_length, 8);
        assert_eq!(config.notification_channels, ["email", "push"]);
    }

    #[test]
    #[serial]
    fn malformed_values_fall_back_to_defaults() {
        env::set_var("GATEWAY_FEE_RATE", "a lot");
        let config = CoreConfig::from_env();
        env::remove_var("GATEWAY_FEE_RATE");

        assert!((config.gateway_fee_rate - 0.029).abs() < f64::EPSILON);
    }
}
