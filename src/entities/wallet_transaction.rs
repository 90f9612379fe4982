//! Wallet transaction entity - Append-only ledger of credits and debits.
//!
//! Rows are never mutated or deleted. A debit always references the booking
//! that triggered it; credits reference a booking only when they compensate a
//! debit for that booking. Top-ups carry an external reference instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a wallet transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum TransactionKind {
    /// Adds to the balance
    #[sea_orm(string_value = "credit")]
    Credit,
    /// Subtracts from the balance
    #[sea_orm(string_value = "debit")]
    Debit,
}

/// Wallet transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance this row affects
    pub user_id: String,
    /// Credit or debit
    pub kind: TransactionKind,
    /// Amount in cents, always positive
    pub amount_cents: i64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Booking that triggered this row, None for top-ups
    pub booking_id: Option<i64>,
    /// External payment reference for top-ups, if any
    pub external_reference: Option<String>,
    /// When the transaction was appended
    pub created_at: DateTimeUtc,
}

/// Defines relationships between WalletTransaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each booking-linked transaction belongs to one booking
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id"
    )]
    Booking,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
