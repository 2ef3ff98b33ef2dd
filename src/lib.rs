//! TCM Store Loyalty
//!
//! Tiered cashback for the China, Thailand and Vietnam storefronts.
//!
//! ## Features
//! - Tier ladder keyed by lifetime spend (3% / 5% / 7% / 10%)
//! - Progressive cashback across tier boundaries within a single order
//! - Loyalty ledger with capped audit history and optimistic concurrency
//! - Order status workflow that credits points once on delivery
//! - Retrying notification queue for status-change emails and pushes

pub mod api;
pub mod config;
pub mod domain;
pub mod notify;
pub mod repository;
pub mod service;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{AccountError, OrderError};
use crate::domain::loyalty::TierError;
use crate::domain::value_objects::PointsError;
use crate::repository::StoreError;

pub use crate::config::Config;
pub use crate::domain::aggregates::{LedgerEntry, LedgerEntryType, LineItem, LoyaltyAccount, Order, OrderStatus};
pub use crate::domain::loyalty::{progressive_cashback, Tier, TierTable};
pub use crate::domain::value_objects::{Points, StoreRegion};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum LoyaltyError {
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    #[error("{0}")]
    Account(#[from] AccountError),

    #[error("Invalid points value: {0}")]
    InvalidPoints(#[from] PointsError),

    #[error("Invalid tier table: {0}")]
    InvalidTiers(#[from] TierError),

    #[error("Concurrent update conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<StoreError> for LoyaltyError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VersionConflict(user_id) => Self::Conflict(format!("loyalty account {user_id}")),
            other => Self::StorageError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoyaltyError>;
