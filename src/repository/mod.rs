//! Persistence seams for orders and loyalty accounts.
//!
//! Two backends: [`memory::MemoryStore`] for local runs and tests, and
//! [`postgres::PgStore`] for deployments with `DATABASE_URL` set.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{LoyaltyAccount, Order};
use crate::domain::value_objects::Points;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Loyalty account {0} was modified concurrently")]
    VersionConflict(Uuid),

    #[error("Order {0} does not exist")]
    MissingOrder(Uuid),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert_order(&self, order: &Order) -> StoreResult<()>;

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// Persists status and `updated_at` only. The points guard is owned by
    /// [`OrderStore::claim_points_credit`] and is never overwritten here.
    async fn save_status(&self, order: &Order) -> StoreResult<()>;

    async fn delivered_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;

    /// Sets `loyalty_points_earned` only if it is still unset. Returns `false`
    /// when another caller already claimed the order.
    async fn claim_points_credit(&self, order_id: Uuid, points: Points) -> StoreResult<bool>;

    async fn release_points_credit(&self, order_id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait LoyaltyStore: Send + Sync {
    async fn get_account(&self, user_id: Uuid) -> StoreResult<Option<LoyaltyAccount>>;

    /// Saves the account if the stored version still equals `account.version()`
    /// (0 meaning "not stored yet"). Returns the new version.
    async fn save_account(&self, account: &LoyaltyAccount) -> StoreResult<i64>;
}
