//! Seat registry - Owns the canonical availability state of every seat.
//!
//! All transitions go through conditional `update_many` statements whose
//! `rows_affected` is checked, so the persistent store is the source of truth
//! for who won a race. Two concurrent locks over overlapping seat sets can
//! never both succeed: the guard `status = available` admits only the first.

use crate::{
    entities::{Seat, seat, seat::SeatStatus},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Atomically locks a set of seats for a hold, transitioning them
/// `available -> reserved` and tagging them with `hold_id`.
///
/// The whole seat set is locked or nothing is: on any conflict the
/// transaction is rolled back and the conflicting seat ids are reported so
/// the caller can re-attempt with a different selection. Returns the sum of
/// the locked seats' prices in cents, frozen at lock time.
pub async fn lock_seats(
    db: &DatabaseConnection,
    event_id: i64,
    seat_ids: &[i64],
    hold_id: i64,
) -> Result<i64> {
    let txn = db.begin().await?;
    // Early returns drop the transaction, rolling back any partial update
    let total = lock_seats_within(&txn, event_id, seat_ids, hold_id).await?;
    txn.commit().await?;
    Ok(total)
}

/// Lock implementation running inside a caller-owned transaction, so the
/// reservation manager can pair seat locking with hold creation atomically.
pub(crate) async fn lock_seats_within<C: ConnectionTrait>(
    conn: &C,
    event_id: i64,
    seat_ids: &[i64],
    hold_id: i64,
) -> Result<i64> {
    let seats = Seat::find()
        .filter(seat::Column::EventId.eq(event_id))
        .filter(seat::Column::Id.is_in(seat_ids.iter().copied()))
        .all(conn)
        .await?;

    if seats.len() != seat_ids.len() {
        let known: Vec<i64> = seats.iter().map(|s| s.id).collect();
        let missing: Vec<i64> = seat_ids
            .iter()
            .copied()
            .filter(|id| !known.contains(id))
            .collect();
        return Err(Error::InvalidSeatSet {
            message: format!("seats {missing:?} do not belong to event {event_id}"),
        });
    }

    let mut conflicting: Vec<i64> = seats
        .iter()
        .filter(|s| s.status != SeatStatus::Available)
        .map(|s| s.id)
        .collect();
    if !conflicting.is_empty() {
        conflicting.sort_unstable();
        return Err(Error::SeatUnavailable { conflicting });
    }

    // Guarded update: only seats still `available` are transitioned. The
    // rows_affected check catches writers that slipped in after the read.
    let result = Seat::update_many()
        .set(seat::ActiveModel {
            status: Set(SeatStatus::Reserved),
            hold_id: Set(Some(hold_id)),
            ..Default::default()
        })
        .filter(seat::Column::EventId.eq(event_id))
        .filter(seat::Column::Id.is_in(seat_ids.iter().copied()))
        .filter(seat::Column::Status.eq(SeatStatus::Available))
        .exec(conn)
        .await?;

    if result.rows_affected != seat_ids.len() as u64 {
        let mut lost: Vec<i64> = Seat::find()
            .filter(seat::Column::Id.is_in(seat_ids.iter().copied()))
            .filter(seat::Column::Status.ne(SeatStatus::Available))
            .all(conn)
            .await?
            .into_iter()
            .filter(|s| s.hold_id != Some(hold_id))
            .map(|s| s.id)
            .collect();
        lost.sort_unstable();
        return Err(Error::SeatUnavailable { conflicting: lost });
    }

    Ok(seats.iter().map(|s| s.price_cents).sum())
}

/// Transitions all seats tagged with `hold_id` from `reserved` to `booked`,
/// clearing the hold tag and recording the owning booking.
///
/// Fails with `SeatsNotReserved` if the hold tags no reserved seats, which
/// means the hold was already released or never locked anything.
pub async fn confirm_seats<C: ConnectionTrait>(
    conn: &C,
    hold_id: i64,
    booking_id: i64,
) -> Result<()> {
    let result = Seat::update_many()
        .set(seat::ActiveModel {
            status: Set(SeatStatus::Booked),
            hold_id: Set(None),
            booking_id: Set(Some(booking_id)),
            ..Default::default()
        })
        .filter(seat::Column::HoldId.eq(hold_id))
        .filter(seat::Column::Status.eq(SeatStatus::Reserved))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::SeatsNotReserved { hold_id });
    }
    Ok(())
}

/// Releases all seats tagged with `hold_id` back to `available`.
///
/// Idempotent: releasing an already-released or unknown hold is a no-op
/// success, because expiry sweeps and explicit cancellations may race.
/// Returns the number of seats actually released.
pub async fn release_seats<C: ConnectionTrait>(conn: &C, hold_id: i64) -> Result<u64> {
    let result = Seat::update_many()
        .set(seat::ActiveModel {
            status: Set(SeatStatus::Available),
            hold_id: Set(None),
            ..Default::default()
        })
        .filter(seat::Column::HoldId.eq(hold_id))
        .filter(seat::Column::Status.eq(SeatStatus::Reserved))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Releases the seats of a cancelled booking, `booked -> available`.
///
/// Used only by booking cancellation. Returns the number of seats released.
pub async fn release_booked_seats<C: ConnectionTrait>(conn: &C, booking_id: i64) -> Result<u64> {
    let result = Seat::update_many()
        .set(seat::ActiveModel {
            status: Set(SeatStatus::Available),
            booking_id: Set(None),
            ..Default::default()
        })
        .filter(seat::Column::BookingId.eq(booking_id))
        .filter(seat::Column::Status.eq(SeatStatus::Booked))
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

/// Provisions a numbered block of seats for an event, all `available`.
///
/// This is the catalog collaborator's entry point; the registry itself never
/// creates seats during reservation or settlement.
pub async fn provision_seats(
    db: &DatabaseConnection,
    event_id: i64,
    section: &str,
    row: &str,
    count: u32,
    price_cents: i64,
) -> Result<Vec<seat::Model>> {
    if count == 0 {
        return Err(Error::InvalidSeatSet {
            message: "cannot provision an empty seat block".to_string(),
        });
    }
    if price_cents < 0 {
        return Err(Error::InvalidAmount {
            amount: price_cents.to_string(),
        });
    }

    let mut created = Vec::with_capacity(count as usize);
    for number in 1..=count {
        let seat = seat::ActiveModel {
            event_id: Set(event_id),
            section: Set(section.to_string()),
            row: Set(row.to_string()),
            number: Set(number as i32),
            price_cents: Set(price_cents),
            status: Set(SeatStatus::Available),
            hold_id: Set(None),
            booking_id: Set(None),
            ..Default::default()
        };
        created.push(seat.insert(db).await?);
    }
    Ok(created)
}

/// Retrieves all seats of an event, ordered by section, row, and number.
pub async fn get_seats_for_event(
    db: &DatabaseConnection,
    event_id: i64,
) -> Result<Vec<seat::Model>> {
    Seat::find()
        .filter(seat::Column::EventId.eq(event_id))
        .order_by_asc(seat::Column::Section)
        .order_by_asc(seat::Column::Row)
        .order_by_asc(seat::Column::Number)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the seats currently tagged by a hold, ordered by id.
pub async fn get_seats_for_hold(
    db: &DatabaseConnection,
    hold_id: i64,
) -> Result<Vec<seat::Model>> {
    Seat::find()
        .filter(seat::Column::HoldId.eq(hold_id))
        .order_by_asc(seat::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves the seats owned by a booking, ordered by id.
pub async fn get_seats_for_booking(
    db: &DatabaseConnection,
    booking_id: i64,
) -> Result<Vec<seat::Model>> {
    Seat::find()
        .filter(seat::Column::BookingId.eq(booking_id))
        .order_by_asc(seat::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
