//! Order workflow: checkout with point redemption and admin status changes.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::aggregates::{LineItem, LoyaltyAccount, Order, OrderStatus};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::loyalty::{TierProgress, TierTable};
use crate::domain::value_objects::{Points, StoreRegion};
use crate::notify::{channels_for, StatusNotification};
use crate::repository::{LoyaltyStore, OrderStore};
use crate::service::accrual::{AccrualOutcome, CashbackAccrual};
use crate::service::aggregator::LifetimeSpendAggregator;
use crate::service::dispatch::DispatchHandle;
use crate::service::ledger::LedgerUpdater;
use crate::{LoyaltyError, Result};

#[derive(Clone, Debug, Serialize)]
pub struct StatusUpdate {
    pub order: Order,
    pub previous: OrderStatus,
    pub accrual: Option<AccrualOutcome>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    ledger: LedgerUpdater,
    aggregator: LifetimeSpendAggregator,
    accrual: CashbackAccrual,
    tiers: Arc<TierTable>,
    notifications: Option<DispatchHandle>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderStore>, accounts: Arc<dyn LoyaltyStore>, tiers: TierTable, notifications: Option<DispatchHandle>) -> Self {
        let tiers = Arc::new(tiers);
        let ledger = LedgerUpdater::new(accounts);
        let aggregator = LifetimeSpendAggregator::new(orders.clone());
        let accrual = CashbackAccrual::new(orders.clone(), aggregator.clone(), ledger.clone(), tiers.clone());
        Self { orders, ledger, aggregator, accrual, tiers, notifications }
    }

    /// Creates an order at checkout. Points redeemed on the order are taken from
    /// the customer's balance before the order is stored.
    pub async fn place_order(&self, user_id: Uuid, store: StoreRegion, items: Vec<LineItem>, loyalty_points_used: Points) -> Result<Order> {
        let mut order = Order::create(user_id, store, items, loyalty_points_used)?;
        let order_id = order.id();
        if !loyalty_points_used.is_zero() {
            self.ledger.spend(user_id, loyalty_points_used, &format!("Redeemed on order {order_id}"), Some(order_id)).await?;
        }
        if let Err(e) = self.orders.insert_order(&order).await {
            error!(%order_id, error = %e, "Failed to store order");
            if !loyalty_points_used.is_zero() {
                if let Err(refund) = self.ledger.earn(user_id, loyalty_points_used, &format!("Refund for unsaved order {order_id}"), Some(order_id)).await {
                    error!(%order_id, %user_id, points = %loyalty_points_used, error = %refund, "Failed to refund redeemed points");
                }
            }
            return Err(e.into());
        }
        order.take_events();
        info!(%order_id, %user_id, %store, subtotal = %order.subtotal(), points_used = %loyalty_points_used, "Order placed");
        Ok(order)
    }

    pub async fn order(&self, order_id: Uuid) -> Result<Order> {
        self.orders.get_order(order_id).await?.ok_or(LoyaltyError::OrderNotFound(order_id))
    }

    /// Admin status change. Cashback accrual and notifications are side effects:
    /// their failures are logged and never undo or fail the status change.
    pub async fn update_status(&self, order_id: Uuid, status: OrderStatus) -> Result<StatusUpdate> {
        let mut order = self.order(order_id).await?;
        let previous = order.transition_to(status)?;
        self.orders.save_status(&order).await?;
        info!(%order_id, from = %previous, to = %status, "Order status changed");

        if previous == OrderStatus::Delivered && status == OrderStatus::Cancelled {
            warn!(%order_id, points = ?order.loyalty_points_earned(), "Delivered order cancelled; earned cashback is not reversed");
        }

        let accrual = if status == OrderStatus::Delivered {
            let outcome = self.accrual.accrue(&order).await;
            if let AccrualOutcome::Credited { points, .. } = &outcome {
                order.mark_points_earned(*points);
            }
            Some(outcome)
        } else {
            None
        };

        for event in order.take_events() {
            if let DomainEvent::Order(OrderEvent::StatusChanged { from, to, .. }) = event {
                if from != to { self.notify(&order, to); }
            }
        }

        Ok(StatusUpdate { order, previous, accrual })
    }

    pub async fn account(&self, user_id: Uuid) -> Result<LoyaltyAccount> {
        self.ledger.account(user_id).await
    }

    pub async fn tier_status(&self, user_id: Uuid) -> TierProgress {
        let lifetime = self.aggregator.lifetime_spend(user_id, None).await;
        self.tiers.progress(lifetime)
    }

    fn notify(&self, order: &Order, status: OrderStatus) {
        let channels = channels_for(status);
        match &self.notifications {
            Some(queue) if !channels.is_empty() => queue.enqueue(channels, &StatusNotification::for_order(order)),
            _ => {}
        }
    }
}
