//! Booking entity - A settlement attempt for a hold, and its final outcome.
//!
//! A booking is created in `Pending` when a hold is submitted for settlement.
//! Its total is frozen from the hold, never re-read from seat prices, and its
//! status only ever advances; it never returns to `Pending`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BookingStatus {
    /// Settlement in flight
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Paid and seats booked
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Settlement failed or a confirmed booking was cancelled
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    /// The underlying hold lapsed before settlement completed
    #[sea_orm(string_value = "expired")]
    Expired,
}

/// How a booking was (or is being) paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum PaymentMethod {
    /// Card payment through the external gateway
    #[sea_orm(string_value = "card")]
    Card,
    /// Debit against the internal wallet ledger
    #[sea_orm(string_value = "wallet")]
    Wallet,
}

/// Booking database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    /// Unique identifier for the booking
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who owns the booking
    pub user_id: String,
    /// Event the booked seats belong to
    pub event_id: i64,
    /// Hold this booking settles
    pub hold_id: i64,
    /// Lifecycle state
    pub status: BookingStatus,
    /// Payment method chosen at submission
    pub payment_method: PaymentMethod,
    /// Total amount in cents, frozen from the hold
    pub total_cents: i64,
    /// Externally shown, unique reference number
    #[sea_orm(unique)]
    pub reference_number: String,
    /// When the booking was created
    pub created_at: DateTimeUtc,
    /// Last status change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Booking and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Seats owned by this booking once confirmed
    #[sea_orm(has_many = "super::seat::Entity")]
    Seats,
    /// Wallet transactions referencing this booking
    #[sea_orm(has_many = "super::wallet_transaction::Entity")]
    WalletTransactions,
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl Related<super::wallet_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
