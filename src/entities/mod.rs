//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod booking;
pub mod hold;
pub mod seat;
pub mod wallet;
pub mod wallet_transaction;

// Re-export specific types to avoid conflicts
pub use booking::{Column as BookingColumn, Entity as Booking, Model as BookingModel};
pub use hold::{Column as HoldColumn, Entity as Hold, Model as HoldModel};
pub use seat::{Column as SeatColumn, Entity as Seat, Model as SeatModel};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel};
pub use wallet_transaction::{
    Column as WalletTransactionColumn, Entity as WalletTransaction, Model as WalletTransactionModel,
};
