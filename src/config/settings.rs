//! Booking settings loaded from config.toml
//!
//! Holds the tunables of the reservation core: the hold TTL, the expiry
//! sweep interval, the payment verification timeout, and the currency code
//! passed to the payment gateway. Missing file or missing fields fall back
//! to defaults.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Booking engine tunables
    #[serde(default)]
    pub booking: BookingSettings,
}

/// Tunables of the reservation and settlement core
#[derive(Debug, Deserialize, Clone)]
pub struct BookingSettings {
    /// How long a hold stays valid before automatic expiry, in minutes
    #[serde(default = "default_hold_ttl_minutes")]
    pub hold_ttl_minutes: u64,
    /// How often the expiry sweep runs, in seconds (default: TTL / 2)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Upper bound on a card verification round-trip, in seconds
    #[serde(default = "default_verify_timeout_secs")]
    pub verify_timeout_secs: u64,
    /// ISO 4217 currency code passed to the payment gateway
    #[serde(default = "default_currency")]
    pub currency: String,
}

const fn default_hold_ttl_minutes() -> u64 {
    10
}

const fn default_sweep_interval_secs() -> u64 {
    // TTL / 2
    default_hold_ttl_minutes() * 60 / 2
}

const fn default_verify_timeout_secs() -> u64 {
    30
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            hold_ttl_minutes: default_hold_ttl_minutes(),
            sweep_interval_secs: default_sweep_interval_secs(),
            verify_timeout_secs: default_verify_timeout_secs(),
            currency: default_currency(),
        }
    }
}

impl BookingSettings {
    /// Hold TTL as a `chrono::Duration` for expiry timestamp arithmetic.
    #[must_use]
    pub fn hold_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::try_from(self.hold_ttl_minutes).unwrap_or(10))
    }

    /// Sweep interval as a `std::time::Duration` for the tokio interval.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Verification timeout as a `std::time::Duration`.
    #[must_use]
    pub const fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }
}

/// Loads booking configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads booking configuration from the default location (./config.toml),
/// falling back to defaults when the file does not exist.
pub fn load_default_config() -> Result<Config> {
    if Path::new("config.toml").exists() {
        load_config("config.toml")
    } else {
        Ok(Config::default())
    }
}
