//! Booking orchestrator - Sequences hold validation, payment, and seat
//! confirmation, with compensating actions on every failure path.
//!
//! The invariant across all paths: either the booking ends CONFIRMED with
//! its seats booked and payment applied, or it ends CANCELLED/EXPIRED with
//! the seats released and any wallet debit compensated. There is no state
//! where money is taken and seats are neither booked nor released.
//!
//! No seat-registry or wallet lock is held across the gateway call: the
//! verification happens between two short, guarded database transitions.

use crate::{
    config::BookingSettings,
    core::{
        holds,
        payment::{PaymentGateway, SignaturePayload},
        seats, wallet,
    },
    entities::{
        Booking, booking, booking::BookingStatus, booking::PaymentMethod,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, warn};

/// Settles a hold into a booking.
///
/// Sequence: validate the hold and its owner, create the booking in PENDING
/// with the total frozen from the hold, execute payment (wallet debit or
/// card verification bounded by the configured timeout), consume the hold,
/// confirm the seats, and mark the booking CONFIRMED. Any failure after the
/// debit is compensated; a card amount captured for a lost hold is flagged
/// for manual reconciliation, never silently reversed.
pub async fn create_booking<G: PaymentGateway>(
    db: &DatabaseConnection,
    gateway: &G,
    settings: &BookingSettings,
    user_id: &str,
    hold_id: i64,
    payment_method: PaymentMethod,
    card_payload: Option<&SignaturePayload>,
) -> Result<booking::Model> {
    let hold = holds::get_hold(db, hold_id).await?;
    if hold.user_id != user_id {
        return Err(Error::NotOwner);
    }

    let now = chrono::Utc::now();
    let pending = booking::ActiveModel {
        user_id: Set(user_id.to_string()),
        event_id: Set(hold.event_id),
        hold_id: Set(hold_id),
        status: Set(BookingStatus::Pending),
        payment_method: Set(payment_method),
        total_cents: Set(hold.total_cents),
        reference_number: Set(new_reference_number()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    match payment_method {
        PaymentMethod::Wallet => {
            let description = format!("Booking {}", pending.reference_number);
            if let Err(e) =
                wallet::debit(db, user_id, hold.total_cents, &description, pending.id).await
            {
                if matches!(e, Error::InsufficientBalance { .. }) {
                    mark_cancelled(db, pending.id).await?;
                    holds::cancel_hold(db, hold_id).await?;
                }
                return Err(e);
            }
        }
        PaymentMethod::Card => {
            if let Err(e) = verify_card(gateway, settings, card_payload).await {
                warn!(
                    booking_id = pending.id,
                    hold_id,
                    error = %e,
                    "card verification failed, cancelling booking"
                );
                mark_cancelled(db, pending.id).await?;
                holds::cancel_hold(db, hold_id).await?;
                return Err(e);
            }
        }
    }

    // Payment is applied; from here every failure must compensate
    if let Err(e) = holds::consume_hold(db, hold_id).await {
        settle_race_loss(db, &pending, payment_method).await?;
        warn!(
            booking_id = pending.id,
            hold_id,
            error = %e,
            "hold lost after payment"
        );
        return Err(Error::HoldRaceLost);
    }

    if let Err(e) = seats::confirm_seats(db, hold_id, pending.id).await {
        // Should not happen once the consume CAS is won; handled like a
        // lost race so the money side stays consistent
        settle_race_loss(db, &pending, payment_method).await?;
        return Err(e);
    }

    let confirmed = Booking::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Confirmed),
            updated_at: Set(chrono::Utc::now()),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(pending.id))
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .exec(db)
        .await?
        .rows_affected
        == 1;
    if !confirmed {
        settle_race_loss(db, &pending, payment_method).await?;
        return Err(Error::HoldRaceLost);
    }

    info!(
        booking_id = pending.id,
        reference = %pending.reference_number,
        total_cents = pending.total_cents,
        "booking confirmed"
    );

    Booking::find_by_id(pending.id)
        .one(db)
        .await?
        .ok_or(Error::BookingNotFound {
            booking_id: pending.id,
        })
}

/// Cancels a CONFIRMED booking.
///
/// Releases the booked seats back to `available`; wallet payments get their
/// compensating credit, card payments are flagged for external refund
/// processing rather than reversed synchronously.
pub async fn cancel_booking(
    db: &DatabaseConnection,
    booking_id: i64,
    actor_user_id: &str,
) -> Result<booking::Model> {
    let found = Booking::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or(Error::BookingNotFound { booking_id })?;

    if found.user_id != actor_user_id {
        return Err(Error::NotOwner);
    }

    // Only CONFIRMED is cancellable; the CAS also loses to concurrent cancels
    let won = Booking::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Cancelled),
            updated_at: Set(chrono::Utc::now()),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(BookingStatus::Confirmed))
        .exec(db)
        .await?
        .rows_affected
        == 1;
    if !won {
        return Err(Error::NotCancellable { booking_id });
    }

    let released = seats::release_booked_seats(db, booking_id).await?;

    match found.payment_method {
        PaymentMethod::Wallet => {
            wallet::compensate(db, booking_id).await?;
        }
        PaymentMethod::Card => {
            info!(
                booking_id,
                reference = %found.reference_number,
                "card-paid booking cancelled, flagged for external refund"
            );
        }
    }

    info!(booking_id, released, "booking cancelled, seats released");

    Booking::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or(Error::BookingNotFound { booking_id })
}

/// Retrieves a booking by id.
pub async fn get_booking(
    db: &DatabaseConnection,
    booking_id: i64,
) -> Result<Option<booking::Model>> {
    Booking::find_by_id(booking_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all bookings of a user, newest first.
pub async fn get_bookings_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<booking::Model>> {
    Booking::find()
        .filter(booking::Column::UserId.eq(user_id))
        .order_by_desc(booking::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Runs the gateway verification bounded by the configured timeout.
/// A timeout is treated identically to a verification failure.
async fn verify_card<G: PaymentGateway>(
    gateway: &G,
    settings: &BookingSettings,
    card_payload: Option<&SignaturePayload>,
) -> Result<()> {
    let payload = card_payload.ok_or_else(|| Error::PaymentFailed {
        code: "missing_payload".to_string(),
    })?;

    match tokio::time::timeout(settings.verify_timeout(), gateway.verify(payload)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(Error::SignatureInvalid)) => Err(Error::PaymentFailed {
            code: "signature_invalid".to_string(),
        }),
        Ok(Err(Error::AuthorizationNotFound { .. })) => Err(Error::PaymentFailed {
            code: "authorization_not_found".to_string(),
        }),
        Ok(Err(e)) => {
            warn!(error = %e, "gateway verification errored");
            Err(Error::PaymentFailed {
                code: "gateway_error".to_string(),
            })
        }
        Err(_) => Err(Error::PaymentFailed {
            code: "verify_timeout".to_string(),
        }),
    }
}

/// Unwinds a booking whose hold was lost after payment was applied.
///
/// Wallet debits are compensated through the ledger. A captured card amount
/// cannot be reversed by this component and is reported for manual
/// reconciliation instead.
async fn settle_race_loss(
    db: &DatabaseConnection,
    pending: &booking::Model,
    payment_method: PaymentMethod,
) -> Result<()> {
    match payment_method {
        PaymentMethod::Wallet => {
            wallet::compensate(db, pending.id).await?;
        }
        PaymentMethod::Card => {
            warn!(
                booking_id = pending.id,
                reference = %pending.reference_number,
                total_cents = pending.total_cents,
                "card amount captured for lost hold, needs manual reconciliation"
            );
        }
    }
    mark_cancelled(db, pending.id).await
}

/// CAS `PENDING -> CANCELLED`; a booking that already left PENDING is left
/// untouched so status never regresses.
async fn mark_cancelled(db: &DatabaseConnection, booking_id: i64) -> Result<()> {
    Booking::update_many()
        .set(booking::ActiveModel {
            status: Set(BookingStatus::Cancelled),
            updated_at: Set(chrono::Utc::now()),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.eq(BookingStatus::Pending))
        .exec(db)
        .await?;
    Ok(())
}

/// Externally shown booking reference, unique per booking.
fn new_reference_number() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("BK-{}", hex[..12].to_uppercase())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::holds::{consume_hold, get_hold, sweep_expired_holds};
    use crate::core::seats::{get_seats_for_booking, get_seats_for_event, provision_seats};
    use crate::core::wallet::{
        credit, derived_balance, get_balance, get_transactions_for_user,
    };
    use crate::entities::Hold;
    use crate::entities::hold::HoldStatus;
    use crate::entities::seat::SeatStatus;
    use crate::entities::wallet_transaction::TransactionKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_wallet_booking_confirms_and_debits() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 3, 5000).await?;
        credit(&db, "alice", 20_000, "Wallet top-up", None, None).await?;

        let hold = create_test_hold(&db, "alice", 1, &[seats[0].id, seats[1].id]).await?;
        let booking = create_wallet_booking(&db, "alice", hold.id).await?;

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.total_cents, 10_000);
        assert_eq!(booking.payment_method, PaymentMethod::Wallet);
        assert!(booking.reference_number.starts_with("BK-"));

        // Seats are booked and owned by the booking
        let booked = get_seats_for_booking(&db, booking.id).await?;
        assert_eq!(booked.len(), 2);
        assert!(booked.iter().all(|s| s.status == SeatStatus::Booked));

        // Hold is consumed, balance debited, ledger reconciles
        let stored_hold = Hold::find_by_id(hold.id).one(&db).await?.unwrap();
        assert_eq!(stored_hold.status, HoldStatus::Consumed);
        assert_eq!(get_balance(&db, "alice").await?, 10_000);
        assert_eq!(derived_balance(&db, "alice").await?, 10_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_wallet_booking_insufficient_balance_releases_everything() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 3000).await?;
        credit(&db, "carol", 1000, "Wallet top-up", None, None).await?;

        let hold = create_test_hold(&db, "carol", 1, &[seats[0].id]).await?;
        let result = create_wallet_booking(&db, "carol", hold.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InsufficientBalance {
                current: 1000,
                required: 3000
            }
        ));

        // Booking is CANCELLED, never CONFIRMED
        let bookings = get_bookings_for_user(&db, "carol").await?;
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].status, BookingStatus::Cancelled);

        // Seat released, hold terminal, balance untouched
        let all = get_seats_for_event(&db, 1).await?;
        assert_eq!(all[0].status, SeatStatus::Available);
        let stored_hold = Hold::find_by_id(hold.id).one(&db).await?.unwrap();
        assert_eq!(stored_hold.status, HoldStatus::Cancelled);
        assert_eq!(get_balance(&db, "carol").await?, 1000);

        Ok(())
    }

    #[tokio::test]
    async fn test_card_booking_confirms_via_gateway() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 2, 4500).await?;
        let hold = create_test_hold(&db, "bob", 1, &[seats[0].id, seats[1].id]).await?;

        let gateway = RecordingGateway::approving();
        let payload = test_signature_payload();
        let booking = create_booking(
            &db,
            &gateway,
            &BookingSettings::default(),
            "bob",
            hold.id,
            PaymentMethod::Card,
            Some(&payload),
        )
        .await?;

        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.total_cents, 9000);
        assert_eq!(gateway.verify_calls(), 1);

        // No wallet activity for card payments
        assert!(get_transactions_for_user(&db, "bob").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_card_booking_signature_failure_cancels() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 4500).await?;
        let hold = create_test_hold(&db, "bob", 1, &[seats[0].id]).await?;

        let gateway = RecordingGateway::rejecting_signature();
        let payload = test_signature_payload();
        let result = create_booking(
            &db,
            &gateway,
            &BookingSettings::default(),
            "bob",
            hold.id,
            PaymentMethod::Card,
            Some(&payload),
        )
        .await;

        match result.unwrap_err() {
            Error::PaymentFailed { code } => assert_eq!(code, "signature_invalid"),
            other => panic!("unexpected error: {other:?}"),
        }

        let bookings = get_bookings_for_user(&db, "bob").await?;
        assert_eq!(bookings[0].status, BookingStatus::Cancelled);
        let all = get_seats_for_event(&db, 1).await?;
        assert_eq!(all[0].status, SeatStatus::Available);

        Ok(())
    }

    #[tokio::test]
    async fn test_card_booking_missing_payload_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 4500).await?;
        let hold = create_test_hold(&db, "bob", 1, &[seats[0].id]).await?;

        let gateway = RecordingGateway::approving();
        let result = create_booking(
            &db,
            &gateway,
            &BookingSettings::default(),
            "bob",
            hold.id,
            PaymentMethod::Card,
            None,
        )
        .await;

        match result.unwrap_err() {
            Error::PaymentFailed { code } => assert_eq!(code, "missing_payload"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gateway.verify_calls(), 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_card_verification_timeout_is_payment_failure() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 4500).await?;
        let hold = create_test_hold(&db, "bob", 1, &[seats[0].id]).await?;

        // Gateway slower than the configured timeout
        let gateway = RecordingGateway::approving().with_delay(std::time::Duration::from_millis(200));
        let settings = BookingSettings {
            verify_timeout_secs: 0,
            ..BookingSettings::default()
        };
        let payload = test_signature_payload();
        let result = create_booking(
            &db,
            &gateway,
            &settings,
            "bob",
            hold.id,
            PaymentMethod::Card,
            Some(&payload),
        )
        .await;

        match result.unwrap_err() {
            Error::PaymentFailed { code } => assert_eq!(code, "verify_timeout"),
            other => panic!("unexpected error: {other:?}"),
        }

        let all = get_seats_for_event(&db, 1).await?;
        assert_eq!(all[0].status, SeatStatus::Available);

        Ok(())
    }

    #[tokio::test]
    async fn test_booking_requires_live_hold_and_owner() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 4500).await?;
        let hold = create_test_hold(&db, "alice", 1, &[seats[0].id]).await?;

        // Wrong owner
        let result = create_wallet_booking(&db, "mallory", hold.id).await;
        assert!(matches!(result.unwrap_err(), Error::NotOwner));

        // Expired hold reads as gone
        backdate_hold_expiry(&db, hold.id, 1).await?;
        let result = create_wallet_booking(&db, "alice", hold.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::HoldExpiredOrNotFound { .. }
        ));

        // Consumed hold is gone too
        let seats2 = provision_seats(&db, 2, "Stalls", "A", 1, 4500).await?;
        let hold2 = create_test_hold(&db, "alice", 2, &[seats2[0].id]).await?;
        consume_hold(&db, hold2.id).await?;
        let result = create_wallet_booking(&db, "alice", hold2.id).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::HoldExpiredOrNotFound { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_wallet_booking_compensates_once() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 2, 5000).await?;
        credit(&db, "alice", 20_000, "Wallet top-up", None, None).await?;

        let hold = create_test_hold(&db, "alice", 1, &[seats[0].id, seats[1].id]).await?;
        let booking = create_wallet_booking(&db, "alice", hold.id).await?;
        assert_eq!(get_balance(&db, "alice").await?, 10_000);

        let cancelled = cancel_booking(&db, booking.id, "alice").await?;
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        // Seats back to available, exactly one compensating credit, balance restored
        let all = get_seats_for_event(&db, 1).await?;
        assert!(all.iter().all(|s| s.status == SeatStatus::Available));
        assert_eq!(get_balance(&db, "alice").await?, 20_000);
        assert_eq!(derived_balance(&db, "alice").await?, 20_000);

        let compensations: Vec<_> = get_transactions_for_user(&db, "alice")
            .await?
            .into_iter()
            .filter(|tx| tx.booking_id == Some(booking.id) && tx.kind == TransactionKind::Credit)
            .collect();
        assert_eq!(compensations.len(), 1);
        assert_eq!(compensations[0].amount_cents, 10_000);

        // Cancelling again is refused
        let result = cancel_booking(&db, booking.id, "alice").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotCancellable { .. }
        ));
        assert_eq!(get_balance(&db, "alice").await?, 20_000);

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_card_booking_skips_wallet() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 4500).await?;
        let hold = create_test_hold(&db, "bob", 1, &[seats[0].id]).await?;

        let gateway = RecordingGateway::approving();
        let payload = test_signature_payload();
        let booking = create_booking(
            &db,
            &gateway,
            &BookingSettings::default(),
            "bob",
            hold.id,
            PaymentMethod::Card,
            Some(&payload),
        )
        .await?;

        let cancelled = cancel_booking(&db, booking.id, "bob").await?;
        assert_eq!(cancelled.status, BookingStatus::Cancelled);

        // Seats released, no wallet rows were ever written
        let all = get_seats_for_event(&db, 1).await?;
        assert_eq!(all[0].status, SeatStatus::Available);
        assert!(get_transactions_for_user(&db, "bob").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_booking_authorization_and_lookup() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 5000).await?;
        credit(&db, "alice", 10_000, "Wallet top-up", None, None).await?;
        let hold = create_test_hold(&db, "alice", 1, &[seats[0].id]).await?;
        let booking = create_wallet_booking(&db, "alice", hold.id).await?;

        let result = cancel_booking(&db, 9999, "alice").await;
        assert!(matches!(
            result.unwrap_err(),
            Error::BookingNotFound { booking_id: 9999 }
        ));

        let result = cancel_booking(&db, booking.id, "mallory").await;
        assert!(matches!(result.unwrap_err(), Error::NotOwner));

        Ok(())
    }

    #[tokio::test]
    async fn test_failed_booking_is_not_cancellable() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 5000).await?;

        let hold = create_test_hold(&db, "carol", 1, &[seats[0].id]).await?;
        // No balance: settlement fails, booking lands in CANCELLED
        let _ = create_wallet_booking(&db, "carol", hold.id).await;
        let booking = &get_bookings_for_user(&db, "carol").await?[0];
        assert_eq!(booking.status, BookingStatus::Cancelled);

        // A booking that never reached CONFIRMED cannot be cancelled again
        let result = cancel_booking(&db, booking.id, "carol").await;
        assert!(matches!(result.unwrap_err(), Error::NotCancellable { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_abandoned_pending_booking_expires_with_its_hold() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 5000).await?;
        let hold = create_test_hold(&db, "dave", 1, &[seats[0].id]).await?;

        // A crash after booking creation leaves a PENDING row behind
        let now = chrono::Utc::now();
        let orphan = booking::ActiveModel {
            user_id: Set("dave".to_string()),
            event_id: Set(1),
            hold_id: Set(hold.id),
            status: Set(BookingStatus::Pending),
            payment_method: Set(PaymentMethod::Wallet),
            total_cents: Set(5000),
            reference_number: Set(new_reference_number()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        backdate_hold_expiry(&db, hold.id, 1).await?;
        sweep_expired_holds(&db).await?;

        let stored = get_booking(&db, orphan.id).await?.unwrap();
        assert_eq!(stored.status, BookingStatus::Expired);
        let all = get_seats_for_event(&db, 1).await?;
        assert_eq!(all[0].status, SeatStatus::Available);

        // The hold is gone for any later settlement attempt
        assert!(get_hold(&db, hold.id).await.is_err());

        Ok(())
    }

    #[tokio::test]
    async fn test_repeated_verify_is_idempotent_at_the_gateway() -> Result<()> {
        let gateway = RecordingGateway::approving();
        let payload = test_signature_payload();

        let auth = gateway.authorize(9000, "USD", "BK-TEST").await?;
        assert_eq!(auth.external_order_id, payload.external_order_id);

        gateway.verify(&payload).await?;
        gateway.verify(&payload).await?;
        assert_eq!(gateway.verify_calls(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_booking_status_never_revisits_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let seats = provision_seats(&db, 1, "Stalls", "A", 1, 5000).await?;
        credit(&db, "alice", 10_000, "Wallet top-up", None, None).await?;
        let hold = create_test_hold(&db, "alice", 1, &[seats[0].id]).await?;
        let booking = create_wallet_booking(&db, "alice", hold.id).await?;
        assert_eq!(booking.status, BookingStatus::Confirmed);

        // The PENDING -> CANCELLED CAS does not touch a CONFIRMED booking
        mark_cancelled(&db, booking.id).await?;
        let stored = get_booking(&db, booking.id).await?.unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);

        Ok(())
    }
}
