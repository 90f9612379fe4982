//! Wallet ledger - Append-only credit/debit log with a materialized balance.
//!
//! Transaction rows are never mutated or deleted; the per-user balance row is
//! a cache that must always reconcile with the log. The debit path is an
//! atomic check-and-append: the balance check and the subtraction are one
//! guarded UPDATE, so two concurrent debits can never both pass against a
//! balance only one of them can satisfy.

use crate::{
    entities::{
        Wallet, WalletTransaction, wallet, wallet_transaction,
        wallet_transaction::TransactionKind,
    },
    errors::{Error, Result},
};
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};

/// Returns the user's materialized balance in cents, 0 for an unknown user.
pub async fn get_balance(db: &DatabaseConnection, user_id: &str) -> Result<i64> {
    Ok(Wallet::find_by_id(user_id)
        .one(db)
        .await?
        .map_or(0, |w| w.balance_cents))
}

/// Recomputes the balance from the full transaction log:
/// `sum(credits) - sum(debits)`. This is the reconciliation surface; it must
/// equal `get_balance` at all externally observable times.
pub async fn derived_balance(db: &DatabaseConnection, user_id: &str) -> Result<i64> {
    let rows = WalletTransaction::find()
        .filter(wallet_transaction::Column::UserId.eq(user_id))
        .all(db)
        .await?;

    Ok(rows.iter().fold(0i64, |acc, tx| match tx.kind {
        TransactionKind::Credit => acc + tx.amount_cents,
        TransactionKind::Debit => acc - tx.amount_cents,
    }))
}

/// Retrieves a user's transaction log, newest first.
pub async fn get_transactions_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<wallet_transaction::Model>> {
    WalletTransaction::find()
        .filter(wallet_transaction::Column::UserId.eq(user_id))
        .order_by_desc(wallet_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Credits a user's wallet.
///
/// Appends a credit row and bumps the materialized balance in one database
/// transaction. `booking_id` ties compensating credits to the booking they
/// reverse; top-ups pass None plus an external payment reference.
pub async fn credit(
    db: &DatabaseConnection,
    user_id: &str,
    amount_cents: i64,
    description: &str,
    booking_id: Option<i64>,
    external_reference: Option<String>,
) -> Result<wallet_transaction::Model> {
    if amount_cents <= 0 {
        return Err(Error::InvalidAmount {
            amount: amount_cents.to_string(),
        });
    }

    let txn = db.begin().await?;
    ensure_wallet(&txn, user_id).await?;

    apply_balance_delta(&txn, user_id, amount_cents).await?;
    let row = append_row(
        &txn,
        user_id,
        TransactionKind::Credit,
        amount_cents,
        description,
        booking_id,
        external_reference,
    )
    .await?;

    txn.commit().await?;
    Ok(row)
}

/// Debits a user's wallet for a booking.
///
/// The balance check and subtraction are a single conditional UPDATE
/// (`... SET balance = balance - ? WHERE user_id = ? AND balance >= ?`);
/// if it affects no row the debit is refused with the current balance and
/// nothing is appended to the log.
pub async fn debit(
    db: &DatabaseConnection,
    user_id: &str,
    amount_cents: i64,
    description: &str,
    booking_id: i64,
) -> Result<wallet_transaction::Model> {
    if amount_cents <= 0 {
        return Err(Error::InvalidAmount {
            amount: amount_cents.to_string(),
        });
    }

    let txn = db.begin().await?;
    ensure_wallet(&txn, user_id).await?;

    let taken = Wallet::update_many()
        .col_expr(
            wallet::Column::BalanceCents,
            Expr::col(wallet::Column::BalanceCents).sub(amount_cents),
        )
        .col_expr(wallet::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(wallet::Column::UserId.eq(user_id))
        .filter(wallet::Column::BalanceCents.gte(amount_cents))
        .exec(&txn)
        .await?
        .rows_affected
        == 1;

    if !taken {
        let current = Wallet::find_by_id(user_id)
            .one(&txn)
            .await?
            .map_or(0, |w| w.balance_cents);
        return Err(Error::InsufficientBalance {
            current,
            required: amount_cents,
        });
    }

    let row = append_row(
        &txn,
        user_id,
        TransactionKind::Debit,
        amount_cents,
        description,
        Some(booking_id),
        None,
    )
    .await?;

    txn.commit().await?;
    Ok(row)
}

/// Issues the compensating credit for a booking's debit, exactly once.
///
/// Looks up the debit(s) tied to `booking_id`; if a credit for that booking
/// already exists, or no debit was ever applied, this is a no-op success.
/// Idempotence matters because compensation is triggered both by failed
/// settlements and by later explicit cancellation, and the two may race.
pub async fn compensate(
    db: &DatabaseConnection,
    booking_id: i64,
) -> Result<Option<wallet_transaction::Model>> {
    let txn = db.begin().await?;

    let rows = WalletTransaction::find()
        .filter(wallet_transaction::Column::BookingId.eq(booking_id))
        .all(&txn)
        .await?;

    let debit_total: i64 = rows
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Debit)
        .map(|tx| tx.amount_cents)
        .sum();
    let already_credited = rows.iter().any(|tx| tx.kind == TransactionKind::Credit);

    if debit_total == 0 || already_credited {
        txn.commit().await?;
        return Ok(None);
    }

    let user_id = rows[0].user_id.clone();
    apply_balance_delta(&txn, &user_id, debit_total).await?;
    let row = append_row(
        &txn,
        &user_id,
        TransactionKind::Credit,
        debit_total,
        &format!("Refund for booking {booking_id}"),
        Some(booking_id),
        None,
    )
    .await?;

    txn.commit().await?;
    Ok(Some(row))
}

/// Tops up a user's wallet from an external payment.
///
/// Returns the new balance and the appended credit row.
pub async fn top_up(
    db: &DatabaseConnection,
    user_id: &str,
    amount_cents: i64,
    external_reference: Option<String>,
) -> Result<(i64, wallet_transaction::Model)> {
    let row = credit(
        db,
        user_id,
        amount_cents,
        "Wallet top-up",
        None,
        external_reference,
    )
    .await?;
    let balance = get_balance(db, user_id).await?;
    Ok((balance, row))
}

/// Creates the wallet row with a zero balance if the user has none yet.
async fn ensure_wallet<C: ConnectionTrait>(conn: &C, user_id: &str) -> Result<()> {
    if Wallet::find_by_id(user_id).one(conn).await?.is_none() {
        wallet::ActiveModel {
            user_id: Set(user_id.to_string()),
            balance_cents: Set(0),
            updated_at: Set(chrono::Utc::now()),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Atomic `balance = balance + delta` on the wallet row.
async fn apply_balance_delta<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    delta: i64,
) -> Result<()> {
    Wallet::update_many()
        .col_expr(
            wallet::Column::BalanceCents,
            Expr::col(wallet::Column::BalanceCents).add(delta),
        )
        .col_expr(wallet::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(wallet::Column::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn append_row<C: ConnectionTrait>(
    conn: &C,
    user_id: &str,
    kind: TransactionKind,
    amount_cents: i64,
    description: &str,
    booking_id: Option<i64>,
    external_reference: Option<String>,
) -> Result<wallet_transaction::Model> {
    wallet_transaction::ActiveModel {
        user_id: Set(user_id.to_string()),
        kind: Set(kind),
        amount_cents: Set(amount_cents),
        description: Set(description.to_string()),
        booking_id: Set(booking_id),
        external_reference: Set(external_reference),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(Into::into)
}
