//! Hold entity - A time-bounded claim on a set of seats, prior to payment.
//!
//! A hold is created when seats are successfully locked and carries the total
//! price frozen at lock time. Its seat set is the set of seats whose
//! `hold_id` tags it. Terminal states are final; a hold is never reused.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum HoldStatus {
    /// Live: seats are reserved, settlement may still happen
    #[sea_orm(string_value = "active")]
    Active,
    /// Converted into a booking by the orchestrator
    #[sea_orm(string_value = "consumed")]
    Consumed,
    /// TTL elapsed before settlement; seats were released by the sweep
    #[sea_orm(string_value = "expired")]
    Expired,
    /// Explicitly abandoned (user cancel or failed settlement)
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Hold database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "holds")]
pub struct Model {
    /// Unique identifier for the hold
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who requested the reservation
    pub user_id: String,
    /// Event the held seats belong to
    pub event_id: i64,
    /// Lifecycle state
    pub status: HoldStatus,
    /// Sum of the locked seats' prices in cents, frozen at lock time
    pub total_cents: i64,
    /// When the hold was created
    pub created_at: DateTimeUtc,
    /// When the hold lapses (`created_at` + TTL)
    pub expires_at: DateTimeUtc,
}

/// Defines relationships between Hold and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Seats currently tagged by this hold
    #[sea_orm(has_many = "super::seat::Entity")]
    Seats,
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
