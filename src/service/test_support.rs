//! Store doubles shared by service tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

use crate::domain::aggregates::{LineItem, LoyaltyAccount, Order};
use crate::domain::value_objects::Points;
use crate::repository::{LoyaltyStore, MemoryStore, OrderStore, StoreError, StoreResult};

pub fn item(price: i64, quantity: u32, is_sample: bool) -> LineItem {
    LineItem { product_id: format!("SKU-{price}"), name: "Angong Niuhuang Wan".into(), quantity, unit_price: Decimal::new(price, 0), is_sample }
}

/// Every call fails as if the database were down.
pub struct FailingStore;

fn down<T>() -> StoreResult<T> { Err(StoreError::Unavailable("connection refused".into())) }

#[async_trait]
impl OrderStore for FailingStore {
    async fn insert_order(&self, _: &Order) -> StoreResult<()> { down() }
    async fn get_order(&self, _: Uuid) -> StoreResult<Option<Order>> { down() }
    async fn save_status(&self, _: &Order) -> StoreResult<()> { down() }
    async fn delivered_orders(&self, _: Uuid) -> StoreResult<Vec<Order>> { down() }
    async fn claim_points_credit(&self, _: Uuid, _: Points) -> StoreResult<bool> { down() }
    async fn release_points_credit(&self, _: Uuid) -> StoreResult<()> { down() }
}

#[async_trait]
impl LoyaltyStore for FailingStore {
    async fn get_account(&self, _: Uuid) -> StoreResult<Option<LoyaltyAccount>> { down() }
    async fn save_account(&self, _: &LoyaltyAccount) -> StoreResult<i64> { down() }
}

/// Memory store whose first `conflicts` account saves report a version conflict.
pub struct ConflictingStore {
    inner: MemoryStore,
    conflicts: AtomicU32,
    saves: AtomicU32,
}

impl ConflictingStore {
    pub fn new(conflicts: u32) -> Self {
        Self { inner: MemoryStore::new(), conflicts: AtomicU32::new(conflicts), saves: AtomicU32::new(0) }
    }
    pub fn save_calls(&self) -> u32 { self.saves.load(Ordering::SeqCst) }
}

#[async_trait]
impl LoyaltyStore for ConflictingStore {
    async fn get_account(&self, user_id: Uuid) -> StoreResult<Option<LoyaltyAccount>> { self.inner.get_account(user_id).await }

    async fn save_account(&self, account: &LoyaltyAccount) -> StoreResult<i64> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::VersionConflict(account.user_id()));
        }
        self.inner.save_account(account).await
    }
}

/// Memory store that refuses to insert orders. Reads and guard updates go through.
pub struct RejectingInsertStore {
    inner: MemoryStore,
}

impl RejectingInsertStore {
    pub fn new() -> Self { Self { inner: MemoryStore::new() } }
}

#[async_trait]
impl OrderStore for RejectingInsertStore {
    async fn insert_order(&self, _: &Order) -> StoreResult<()> { down() }
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> { self.inner.get_order(id).await }
    async fn save_status(&self, order: &Order) -> StoreResult<()> { self.inner.save_status(order).await }
    async fn delivered_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> { self.inner.delivered_orders(user_id).await }
    async fn claim_points_credit(&self, order_id: Uuid, points: Points) -> StoreResult<bool> {
        self.inner.claim_points_credit(order_id, points).await
    }
    async fn release_points_credit(&self, order_id: Uuid) -> StoreResult<()> { self.inner.release_points_credit(order_id).await }
}
