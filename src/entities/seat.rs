//! Seat entity - Represents a single sellable seat of an event.
//!
//! Each seat belongs to one event and carries its own frozen price in cents.
//! The `status` column is the canonical availability state; `hold_id` tags a
//! seat while it is reserved and `booking_id` once it is booked.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Availability state of a seat.
///
/// A seat leaves `Reserved` either to `Booked` (settlement succeeded) or back
/// to `Available` (expiry/failure/cancellation). There is no direct
/// `Available` to `Booked` transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum SeatStatus {
    /// Free to be locked by a new hold
    #[sea_orm(string_value = "available")]
    Available,
    /// Locked by a live hold, waiting for settlement or expiry
    #[sea_orm(string_value = "reserved")]
    Reserved,
    /// Sold; owned by a confirmed booking
    #[sea_orm(string_value = "booked")]
    Booked,
}

/// Seat database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seats")]
pub struct Model {
    /// Unique identifier for the seat
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Event this seat belongs to
    pub event_id: i64,
    /// Venue section (e.g., "Balcony", "Stalls")
    pub section: String,
    /// Row label within the section
    pub row: String,
    /// Seat number within the row
    pub number: i32,
    /// Price in cents, frozen at provisioning time
    pub price_cents: i64,
    /// Canonical availability state
    pub status: SeatStatus,
    /// Hold currently reserving this seat, if any
    pub hold_id: Option<i64>,
    /// Booking that owns this seat once it is booked, if any
    pub booking_id: Option<i64>,
}

/// Defines relationships between Seat and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A reserved seat is tagged with the hold that locked it
    #[sea_orm(
        belongs_to = "super::hold::Entity",
        from = "Column::HoldId",
        to = "super::hold::Column::Id"
    )]
    Hold,
    /// A booked seat belongs to the booking that settled it
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::hold::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Hold.def()
    }
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
