//! Shared test utilities for the booking engine.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults, plus a programmable
//! payment gateway double.

use crate::{
    config::BookingSettings,
    core::{
        bookings, holds,
        payment::{PaymentGateway, PendingAuthorization, SignaturePayload},
    },
    entities::{Hold, booking, hold},
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    // Tests treat seat.hold_id / seat.booking_id and wallet_transaction
    // .booking_id as loose tags (see DESIGN.md), so the FK constraints that
    // schema generation derives from the Relation enums stay unenforced here.
    db.execute_unprepared("PRAGMA foreign_keys = OFF;").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a hold with the default settings (10 minute TTL).
pub async fn create_test_hold(
    db: &DatabaseConnection,
    user_id: &str,
    event_id: i64,
    seat_ids: &[i64],
) -> Result<hold::Model> {
    holds::create_hold(db, &BookingSettings::default(), user_id, event_id, seat_ids).await
}

/// Pushes a hold's expiry into the past, simulating TTL lapse without
/// waiting for wall-clock time.
pub async fn backdate_hold_expiry(
    db: &DatabaseConnection,
    hold_id: i64,
    seconds_ago: i64,
) -> Result<()> {
    let stored = Hold::find_by_id(hold_id)
        .one(db)
        .await?
        .ok_or(Error::HoldExpiredOrNotFound { hold_id })?;
    let mut active: hold::ActiveModel = stored.into();
    active.expires_at = Set(chrono::Utc::now() - chrono::Duration::seconds(seconds_ago));
    active.update(db).await?;
    Ok(())
}

/// Settles a hold with wallet payment under default settings. The gateway is
/// never reached on the wallet path, so a plain approving double is passed.
pub async fn create_wallet_booking(
    db: &DatabaseConnection,
    user_id: &str,
    hold_id: i64,
) -> Result<booking::Model> {
    bookings::create_booking(
        db,
        &RecordingGateway::approving(),
        &BookingSettings::default(),
        user_id,
        hold_id,
        booking::PaymentMethod::Wallet,
        None,
    )
    .await
}

/// A well-formed callback payload matching `RecordingGateway`'s fixed order.
#[must_use]
pub fn test_signature_payload() -> SignaturePayload {
    SignaturePayload {
        external_order_id: "order_test_1".to_string(),
        payment_id: "pay_test_1".to_string(),
        signature: "sig_test_1".to_string(),
    }
}

/// What the gateway double should do on `verify`.
#[derive(Debug, Clone, Copy)]
enum GatewayOutcome {
    Approve,
    RejectSignature,
    UnknownOrder,
}

/// Programmable payment gateway double that records verification calls.
pub struct RecordingGateway {
    outcome: GatewayOutcome,
    delay: Duration,
    verify_calls: AtomicUsize,
}

impl RecordingGateway {
    /// Gateway that verifies every payload successfully.
    #[must_use]
    pub fn approving() -> Self {
        Self::new(GatewayOutcome::Approve)
    }

    /// Gateway that rejects every payload's signature.
    #[must_use]
    pub fn rejecting_signature() -> Self {
        Self::new(GatewayOutcome::RejectSignature)
    }

    /// Gateway that knows no order.
    #[must_use]
    pub fn unknown_order() -> Self {
        Self::new(GatewayOutcome::UnknownOrder)
    }

    /// Adds an artificial verification latency, for timeout tests.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `verify` calls that reached the gateway.
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    const fn new(outcome: GatewayOutcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            verify_calls: AtomicUsize::new(0),
        }
    }
}

impl PaymentGateway for RecordingGateway {
    async fn authorize(
        &self,
        _amount_cents: i64,
        _currency: &str,
        _receipt: &str,
    ) -> Result<PendingAuthorization> {
        Ok(PendingAuthorization {
            external_order_id: "order_test_1".to_string(),
        })
    }

    async fn verify(&self, payload: &SignaturePayload) -> Result<()> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.outcome {
            GatewayOutcome::Approve => Ok(()),
            GatewayOutcome::RejectSignature => Err(Error::SignatureInvalid),
            GatewayOutcome::UnknownOrder => Err(Error::AuthorizationNotFound {
                external_order_id: payload.external_order_id.clone(),
            }),
        }
    }
}
