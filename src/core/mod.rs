//! Core business logic - framework-agnostic reservation and settlement
//! operations. Each module owns one component of the engine and is the only
//! writer of that component's state.

/// Booking orchestrator: settlement state machine and cancellation
pub mod bookings;
/// Reservation manager: time-bounded holds and the expiry sweep
pub mod holds;
/// Fixed-point money parsing and formatting
pub mod money;
/// Payment gateway contract for the card path
pub mod payment;
/// Seat registry: canonical seat availability state
pub mod seats;
/// Wallet ledger: append-only credit/debit log and balances
pub mod wallet;
