//! Database configuration module for the booking engine.
//!
//! Handles database connection and table creation using `SeaORM`. The schema
//! is generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the database tables always match
//! the Rust struct definitions without manual SQL.

use crate::entities::{Booking, Hold, Seat, Wallet, WalletTransaction};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/boxoffice.sqlite".to_string())
}

/// Establishes a connection to the database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Creates tables for seats, holds, bookings, wallets, and wallet transactions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let seat_table = schema.create_table_from_entity(Seat);
    let hold_table = schema.create_table_from_entity(Hold);
    let booking_table = schema.create_table_from_entity(Booking);
    let wallet_table = schema.create_table_from_entity(Wallet);
    let wallet_transaction_table = schema.create_table_from_entity(WalletTransaction);

    db.execute(builder.build(&seat_table)).await?;
    db.execute(builder.build(&hold_table)).await?;
    db.execute(builder.build(&booking_table)).await?;
    db.execute(builder.build(&wallet_table)).await?;
    db.execute(builder.build(&wallet_transaction_table)).await?;

    Ok(())
}
