/// Database configuration and connection management
pub mod database;

/// Booking engine settings loaded from config.toml
pub mod settings;

pub use settings::BookingSettings;
