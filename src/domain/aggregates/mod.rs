//! Aggregates module
pub mod order;
pub mod loyalty_account;

pub use order::{LineItem, Order, OrderError, OrderStatus};
pub use loyalty_account::{AccountError, LedgerEntry, LedgerEntryType, LoyaltyAccount, HISTORY_LIMIT};
