//! Wallet entity - Materialized balance per user.
//!
//! The balance is a cache over the append-only transaction log and must equal
//! `sum(credits) - sum(debits)` at all externally observable times. Rows are
//! created lazily the first time a user's wallet is touched.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// User who owns the wallet
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    /// Materialized balance in cents
    pub balance_cents: i64,
    /// Last balance change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Wallet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
