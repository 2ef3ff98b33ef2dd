//! One-time cashback accrual for delivered orders.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::loyalty::{progressive_cashback, TierTable};
use crate::domain::value_objects::Points;
use crate::repository::OrderStore;
use crate::service::aggregator::LifetimeSpendAggregator;
use crate::service::ledger::LedgerUpdater;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccrualOutcome {
    NotDelivered,
    AlreadyCredited,
    NothingEligible,
    Credited { points: Points, lifetime_before: Decimal },
    Failed { reason: String },
}

#[derive(Clone)]
pub struct CashbackAccrual {
    orders: Arc<dyn OrderStore>,
    aggregator: LifetimeSpendAggregator,
    ledger: LedgerUpdater,
    tiers: Arc<TierTable>,
}

impl CashbackAccrual {
    pub fn new(orders: Arc<dyn OrderStore>, aggregator: LifetimeSpendAggregator, ledger: LedgerUpdater, tiers: Arc<TierTable>) -> Self {
        Self { orders, aggregator, ledger, tiers }
    }

    /// Credits cashback for `order` at most once. Never returns an error: failures
    /// are logged and reported as [`AccrualOutcome::Failed`] so the status change
    /// that triggered accrual still goes through.
    pub async fn accrue(&self, order: &Order) -> AccrualOutcome {
        let order_id = order.id();
        if order.status() != OrderStatus::Delivered { return AccrualOutcome::NotDelivered; }
        if order.is_points_credited() {
            debug!(%order_id, "Cashback already credited");
            return AccrualOutcome::AlreadyCredited;
        }

        let eligible = order.cashback_eligible_subtotal();
        if eligible <= Decimal::ZERO { return AccrualOutcome::NothingEligible; }

        let lifetime_before = self.aggregator.lifetime_spend(order.user_id(), Some(order_id)).await;
        let points = progressive_cashback(&self.tiers, lifetime_before, eligible);
        if points.is_zero() { return AccrualOutcome::NothingEligible; }

        match self.orders.claim_points_credit(order_id, points).await {
            Ok(true) => {}
            Ok(false) => return AccrualOutcome::AlreadyCredited,
            Err(e) => {
                error!(%order_id, error = %e, "Failed to claim order for cashback");
                return AccrualOutcome::Failed { reason: e.to_string() };
            }
        }

        let description = format!("Cashback for order {order_id}");
        match self.ledger.earn(order.user_id(), points, &description, Some(order_id)).await {
            Ok(_) => {
                info!(%order_id, user_id = %order.user_id(), %points, %lifetime_before, "Cashback credited");
                AccrualOutcome::Credited { points, lifetime_before }
            }
            Err(e) => {
                error!(%order_id, error = %e, "Failed to credit cashback");
                // hand the order back so the next delivery event can try again
                if let Err(release) = self.orders.release_points_credit(order_id).await {
                    error!(%order_id, error = %release, "Failed to release cashback claim");
                }
                AccrualOutcome::Failed { reason: e.to_string() }
            }
        }
    }
}
