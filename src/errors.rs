//! Unified error types for the booking engine.
//!
//! Contention on seats and hold expiry are expected, user-facing conditions
//! and carry enough detail for the caller to re-attempt seat selection.
//! Payment failures surface a generic message plus an internal code for
//! support triage; gateway internals are never leaked.

use thiserror::Error;

/// All failure modes of the reservation and settlement core.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more requested seats are not available to lock.
    /// Retryable by the caller with a different or refreshed seat set.
    #[error("seats unavailable: {conflicting:?}")]
    SeatUnavailable {
        /// Seat ids that were not `available` at lock time
        conflicting: Vec<i64>,
    },

    /// The requested seat set is malformed (empty, or seats that do not
    /// belong to the event).
    #[error("invalid seat selection: {message}")]
    InvalidSeatSet { message: String },

    /// The hold does not exist, is past its TTL, or is already terminal.
    /// The caller must re-reserve.
    #[error("hold {hold_id} expired or not found")]
    HoldExpiredOrNotFound { hold_id: i64 },

    /// The hold tags no seats in `reserved` state.
    #[error("hold {hold_id} has no reserved seats")]
    SeatsNotReserved { hold_id: i64 },

    /// Wallet balance cannot cover the debit. Amounts are in cents.
    #[error("insufficient balance: have {current}, need {required}")]
    InsufficientBalance { current: i64, required: i64 },

    /// Card payment verification failed or timed out. `code` is an internal
    /// triage code, not shown verbatim to end users.
    #[error("payment failed ({code})")]
    PaymentFailed { code: String },

    /// The provider's callback proof did not validate.
    #[error("payment signature invalid")]
    SignatureInvalid,

    /// The gateway order referenced by a callback is unknown.
    #[error("authorization {external_order_id} not found")]
    AuthorizationNotFound { external_order_id: String },

    /// Payment succeeded but the hold was consumed or expired concurrently.
    /// Surfaced to callers as "reservation lost, please retry booking".
    #[error("reservation lost, please retry booking")]
    HoldRaceLost,

    /// No booking with the given id.
    #[error("booking {booking_id} not found")]
    BookingNotFound { booking_id: i64 },

    /// The acting user does not own the hold or booking.
    #[error("not the owner of this resource")]
    NotOwner,

    /// The booking is not in a cancellable state (only CONFIRMED is).
    #[error("booking {booking_id} cannot be cancelled")]
    NotCancellable { booking_id: i64 },

    /// A non-positive or malformed monetary amount.
    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: String },

    /// Configuration error
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
