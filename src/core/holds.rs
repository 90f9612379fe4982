//! Reservation manager - Converts seat selections into time-bounded holds.
//!
//! A hold moves `ACTIVE -> {CONSUMED, EXPIRED, CANCELLED}` and terminal
//! states are final. Every transition out of `ACTIVE` is a compare-and-set on
//! the hold row, so the expiry sweep and a concurrent settlement can race
//! safely: whichever wins the CAS proceeds, the loser gets an error.

use crate::{
    config::BookingSettings,
    core::seats,
    entities::{Booking, Hold, booking, booking::BookingStatus, hold, hold::HoldStatus},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Creates a hold over a seat selection, locking the seats atomically.
///
/// Seat ids are deduplicated; an empty selection is rejected. The hold row
/// and the seat locks are written in one database transaction, so a lock
/// conflict leaves no hold row behind. The seats' total price is frozen onto
/// the hold at lock time and is never re-read at settlement.
pub async fn create_hold(
    db: &DatabaseConnection,
    settings: &BookingSettings,
    user_id: &str,
    event_id: i64,
    seat_ids: &[i64],
) -> Result<hold::Model> {
    let mut ids: Vec<i64> = seat_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(Error::InvalidSeatSet {
            message: "seat selection is empty".to_string(),
        });
    }

    let now = chrono::Utc::now();
    let txn = db.begin().await?;

    let hold = hold::ActiveModel {
        user_id: Set(user_id.to_string()),
        event_id: Set(event_id),
        status: Set(HoldStatus::Active),
        total_cents: Set(0),
        created_at: Set(now),
        expires_at: Set(now + settings.hold_ttl()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    // A lock failure propagates here and rolls the hold row back with it
    let total = seats::lock_seats_within(&txn, event_id, &ids, hold.id).await?;

    let mut active: hold::ActiveModel = hold.into();
    active.total_cents = Set(total);
    let hold = active.update(&txn).await?;

    txn.commit().await?;

    debug!(
        hold_id = hold.id,
        user_id, event_id, total_cents = total,
        "hold created"
    );
    Ok(hold)
}

/// Retrieves a live hold by id.
///
/// A hold past its `expires_at` reads as gone even if the sweep has not
/// visited it yet, so callers never act on a stale hold.
pub async fn get_hold(db: &DatabaseConnection, hold_id: i64) -> Result<hold::Model> {
    let hold = Hold::find_by_id(hold_id)
        .one(db)
        .await?
        .ok_or(Error::HoldExpiredOrNotFound { hold_id })?;

    if hold.status != HoldStatus::Active || hold.expires_at <= chrono::Utc::now() {
        return Err(Error::HoldExpiredOrNotFound { hold_id });
    }
    Ok(hold)
}

/// Marks a hold CONSUMED, exactly once, immediately before seat confirmation.
///
/// Compare-and-set against `ACTIVE` and the TTL: if the expiry sweep (or
/// anything else) got there first, the caller loses and must treat the hold
/// as gone. Only the booking orchestrator calls this.
pub async fn consume_hold<C: ConnectionTrait>(conn: &C, hold_id: i64) -> Result<()> {
    let result = Hold::update_many()
        .set(hold::ActiveModel {
            status: Set(HoldStatus::Consumed),
            ..Default::default()
        })
        .filter(hold::Column::Id.eq(hold_id))
        .filter(hold::Column::Status.eq(HoldStatus::Active))
        .filter(hold::Column::ExpiresAt.gt(chrono::Utc::now()))
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        return Err(Error::HoldExpiredOrNotFound { hold_id });
    }
    Ok(())
}

/// Cancels an ACTIVE hold and releases its seats.
///
/// Idempotent: cancelling a hold that is already terminal is a no-op
/// success, since failed settlements and explicit user cancels may race.
pub async fn cancel_hold(db: &DatabaseConnection, hold_id: i64) -> Result<()> {
    let result = Hold::update_many()
        .set(hold::ActiveModel {
            status: Set(HoldStatus::Cancelled),
            ..Default::default()
        })
        .filter(hold::Column::Id.eq(hold_id))
        .filter(hold::Column::Status.eq(HoldStatus::Active))
        .exec(db)
        .await?;

    if result.rows_affected == 1 {
        seats::release_seats(db, hold_id).await?;
        debug!(hold_id, "hold cancelled, seats released");
    }
    Ok(())
}

/// Expires all ACTIVE holds past their TTL and releases their seats.
///
/// Each hold is expired through a CAS, so a hold consumed concurrently by a
/// settlement is left alone. PENDING bookings that were abandoned mid-flight
/// against an expired hold are marked EXPIRED here. Returns the number of
/// holds expired by this pass.
pub async fn sweep_expired_holds(db: &DatabaseConnection) -> Result<u64> {
    let now = chrono::Utc::now();
    let stale = Hold::find()
        .filter(hold::Column::Status.eq(HoldStatus::Active))
        .filter(hold::Column::ExpiresAt.lte(now))
        .all(db)
        .await?;

    let mut expired = 0u64;
    for hold in stale {
        let won = Hold::update_many()
            .set(hold::ActiveModel {
                status: Set(HoldStatus::Expired),
                ..Default::default()
            })
            .filter(hold::Column::Id.eq(hold.id))
            .filter(hold::Column::Status.eq(HoldStatus::Active))
            .exec(db)
            .await?
            .rows_affected
            == 1;
        if !won {
            // Lost the race to a concurrent consume; nothing to clean up
            continue;
        }

        let released = seats::release_seats(db, hold.id).await?;
        Booking::update_many()
            .set(booking::ActiveModel {
                status: Set(BookingStatus::Expired),
                updated_at: Set(chrono::Utc::now()),
                ..Default::default()
            })
            .filter(booking::Column::HoldId.eq(hold.id))
            .filter(booking::Column::Status.eq(BookingStatus::Pending))
            .exec(db)
            .await?;

        debug!(hold_id = hold.id, released, "hold expired by sweep");
        expired += 1;
    }

    if expired > 0 {
        info!(expired, "expiry sweep released stale holds");
    }
    Ok(expired)
}

/// Runs the expiry sweep forever on a fixed interval.
///
/// Sweep failures are logged and the loop keeps going; a transient database
/// error must not kill the sweeper.
pub async fn run_expiry_sweep(db: DatabaseConnection, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = sweep_expired_holds(&db).await {
            warn!(error = %e, "expiry sweep failed");
        }
    }
}
