//! Lifetime spend across a customer's delivered orders.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::repository::OrderStore;

#[derive(Clone)]
pub struct LifetimeSpendAggregator {
    orders: Arc<dyn OrderStore>,
}

impl LifetimeSpendAggregator {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self { Self { orders } }

    /// Cashback-eligible subtotal summed over delivered orders, skipping `exclude_order`.
    ///
    /// Read failures are logged and count as zero spend. The sum saturates at `Decimal::MAX`.
    pub async fn lifetime_spend(&self, user_id: Uuid, exclude_order: Option<Uuid>) -> Decimal {
        match self.orders.delivered_orders(user_id).await {
            Ok(orders) => orders.iter()
                .filter(|o| Some(o.id()) != exclude_order)
                .map(Order::cashback_eligible_subtotal)
                .fold(Decimal::ZERO, |acc, spend| acc.checked_add(spend).unwrap_or(Decimal::MAX)),
            Err(e) => {
                warn!(%user_id, error = %e, "Failed to read delivered orders, lifetime spend treated as zero");
                Decimal::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{LineItem, OrderStatus};
    use crate::domain::value_objects::{Points, StoreRegion};
    use crate::repository::MemoryStore;
    use crate::service::test_support::{item, FailingStore};

    async fn seed(store: &MemoryStore, user: Uuid, price: i64, points_used: i64, status: OrderStatus) -> Order {
        let mut order = Order::create(user, StoreRegion::China, vec![item(price, 1, false), item(999, 1, true)], Points::new(points_used).unwrap()).unwrap();
        order.transition_to(status).unwrap();
        store.insert_order(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_sums_only_delivered_eligible_subtotals() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed(&store, user, 10_000, 0, OrderStatus::Delivered).await;
        seed(&store, user, 5_000, 1_000, OrderStatus::Delivered).await;
        seed(&store, user, 7_000, 0, OrderStatus::Shipped).await;
        seed(&store, user, 3_000, 0, OrderStatus::Cancelled).await;
        seed(&store, Uuid::new_v4(), 50_000, 0, OrderStatus::Delivered).await;

        let aggregator = LifetimeSpendAggregator::new(store);
        assert_eq!(aggregator.lifetime_spend(user, None).await, Decimal::new(14_000, 0));
    }

    #[tokio::test]
    async fn test_excludes_the_order_being_accrued() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed(&store, user, 10_000, 0, OrderStatus::Delivered).await;
        let current = seed(&store, user, 4_000, 0, OrderStatus::Delivered).await;

        let aggregator = LifetimeSpendAggregator::new(store);
        assert_eq!(aggregator.lifetime_spend(user, Some(current.id())).await, Decimal::new(10_000, 0));
    }

    #[tokio::test]
    async fn test_saturates_instead_of_overflowing() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        for _ in 0..2 {
            let whale = LineItem { unit_price: Decimal::MAX, ..item(1, 1, false) };
            let mut order = Order::create(user, StoreRegion::China, vec![whale], Points::ZERO).unwrap();
            order.transition_to(OrderStatus::Delivered).unwrap();
            store.insert_order(&order).await.unwrap();
        }

        let aggregator = LifetimeSpendAggregator::new(store);
        assert_eq!(aggregator.lifetime_spend(user, None).await, Decimal::MAX);
    }

    #[tokio::test]
    async fn test_no_orders_or_read_error_is_zero() {
        let empty = LifetimeSpendAggregator::new(Arc::new(MemoryStore::new()));
        assert_eq!(empty.lifetime_spend(Uuid::new_v4(), None).await, Decimal::ZERO);
        let broken = LifetimeSpendAggregator::new(Arc::new(FailingStore));
        assert_eq!(broken.lifetime_spend(Uuid::new_v4(), None).await, Decimal::ZERO);
    }
}
