//! In-memory store backed by `tokio::sync::RwLock` maps.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LoyaltyStore, OrderStore, StoreError, StoreResult};
use crate::domain::aggregates::{LoyaltyAccount, Order, OrderStatus};
use crate::domain::value_objects::Points;

#[derive(Debug, Default)]
pub struct MemoryStore {
    orders: RwLock<HashMap<Uuid, Order>>,
    accounts: RwLock<HashMap<Uuid, LoyaltyAccount>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        let mut stored = order.clone();
        stored.take_events();
        self.orders.write().await.insert(stored.id(), stored);
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn save_status(&self, order: &Order) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order.id()).ok_or(StoreError::MissingOrder(order.id()))?;
        stored.transition_to(order.status()).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        stored.take_events();
        Ok(())
    }

    async fn delivered_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        Ok(self.orders.read().await.values()
            .filter(|o| o.user_id() == user_id && o.status() == OrderStatus::Delivered)
            .cloned()
            .collect())
    }

    async fn claim_points_credit(&self, order_id: Uuid, points: Points) -> StoreResult<bool> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order_id).ok_or(StoreError::MissingOrder(order_id))?;
        if stored.is_points_credited() { return Ok(false); }
        stored.mark_points_earned(points);
        stored.take_events();
        Ok(true)
    }

    async fn release_points_credit(&self, order_id: Uuid) -> StoreResult<()> {
        let mut orders = self.orders.write().await;
        let stored = orders.get_mut(&order_id).ok_or(StoreError::MissingOrder(order_id))?;
        stored.clear_points_earned();
        Ok(())
    }
}

#[async_trait]
impl LoyaltyStore for MemoryStore {
    async fn get_account(&self, user_id: Uuid) -> StoreResult<Option<LoyaltyAccount>> {
        Ok(self.accounts.read().await.get(&user_id).cloned())
    }

    async fn save_account(&self, account: &LoyaltyAccount) -> StoreResult<i64> {
        let mut accounts = self.accounts.write().await;
        let current = accounts.get(&account.user_id()).map(|a| a.version()).unwrap_or(0);
        if current != account.version() { return Err(StoreError::VersionConflict(account.user_id())); }
        let mut stored = account.clone();
        stored.take_events();
        stored.set_version(current + 1);
        accounts.insert(stored.user_id(), stored);
        Ok(current + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::LineItem;
    use crate::domain::value_objects::StoreRegion;
    use rust_decimal::Decimal;

    fn order(user: Uuid) -> Order {
        let item = LineItem { product_id: "P1".into(), name: "Ginseng".into(), quantity: 1, unit_price: Decimal::new(1000, 0), is_sample: false };
        Order::create(user, StoreRegion::China, vec![item], Points::ZERO).unwrap()
    }

    #[tokio::test]
    async fn test_claim_is_one_shot() {
        let store = MemoryStore::new();
        let o = order(Uuid::new_v4());
        store.insert_order(&o).await.unwrap();
        assert!(store.claim_points_credit(o.id(), Points::new(30).unwrap()).await.unwrap());
        assert!(!store.claim_points_credit(o.id(), Points::new(30).unwrap()).await.unwrap());
        store.release_points_credit(o.id()).await.unwrap();
        assert!(store.claim_points_credit(o.id(), Points::new(30).unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delivered_orders_filters_by_user_and_status() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut delivered = order(user);
        delivered.transition_to(OrderStatus::Delivered).unwrap();
        store.insert_order(&delivered).await.unwrap();
        store.insert_order(&order(user)).await.unwrap();
        store.insert_order(&order(Uuid::new_v4())).await.unwrap();
        let found = store.delivered_orders(user).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), delivered.id());
    }

    #[tokio::test]
    async fn test_stale_account_save_conflicts() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut first = LoyaltyAccount::open(user);
        first.earn(Points::new(10).unwrap(), "A", None).unwrap();
        assert_eq!(store.save_account(&first).await.unwrap(), 1);
        // second writer still holds version 0
        let mut stale = LoyaltyAccount::open(user);
        stale.earn(Points::new(5).unwrap(), "B", None).unwrap();
        assert!(matches!(store.save_account(&stale).await, Err(StoreError::VersionConflict(_))));
        let stored = store.get_account(user).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.points_balance().value(), 10);
    }
}
