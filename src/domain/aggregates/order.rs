//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::{Points, StoreRegion, UnknownValue};
use crate::domain::events::{DomainEvent, OrderEvent};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    user_id: Uuid,
    store: StoreRegion,
    status: OrderStatus,
    items: Vec<LineItem>,
    subtotal: Decimal,
    loyalty_points_used: Points,
    loyalty_points_earned: Option<Points>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Free samples and trial packs. Never counted toward cashback or lifetime spend.
    #[serde(default)]
    pub is_sample: bool,
}

impl LineItem {
    /// `None` when price times quantity does not fit in a `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> { self.unit_price.checked_mul(Decimal::from(self.quantity)) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = UnknownValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownValue(other.to_string())),
        }
    }
}

/// Sum of non-sample line totals. Fails on the first item whose total overflows.
pub fn non_sample_subtotal(items: &[LineItem]) -> Result<Decimal, OrderError> {
    items.iter().filter(|i| !i.is_sample).try_fold(Decimal::ZERO, |acc, i| {
        i.line_total().and_then(|t| acc.checked_add(t)).ok_or_else(|| OrderError::InvalidItem(i.product_id.clone()))
    })
}

impl Order {
    pub fn create(user_id: Uuid, store: StoreRegion, items: Vec<LineItem>, loyalty_points_used: Points) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        if let Some(bad) = items.iter().find(|i| i.quantity == 0 || i.unit_price < Decimal::ZERO) {
            return Err(OrderError::InvalidItem(bad.product_id.clone()));
        }
        let subtotal = non_sample_subtotal(&items)?;
        if Decimal::from(loyalty_points_used.value()) > subtotal { return Err(OrderError::PointsExceedSubtotal); }
        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut order = Self {
            id, user_id, store, status: OrderStatus::Pending, items, subtotal,
            loyalty_points_used, loyalty_points_earned: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order_id: id, user_id }));
        Ok(order)
    }

    /// Rebuilds an order from storage without raising events.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: Uuid, user_id: Uuid, store: StoreRegion, status: OrderStatus, items: Vec<LineItem>,
        loyalty_points_used: Points, loyalty_points_earned: Option<Points>,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        // totals were checked by `create`
        let subtotal = non_sample_subtotal(&items).unwrap_or(Decimal::MAX);
        Self {
            id, user_id, store, status, items, subtotal, loyalty_points_used, loyalty_points_earned,
            created_at, updated_at, events: vec![],
        }
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn store(&self) -> StoreRegion { self.store }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn subtotal(&self) -> Decimal { self.subtotal }
    pub fn loyalty_points_used(&self) -> Points { self.loyalty_points_used }
    pub fn loyalty_points_earned(&self) -> Option<Points> { self.loyalty_points_earned }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn is_points_credited(&self) -> bool { self.loyalty_points_earned.is_some() }

    /// Amount cashback is earned on: non-sample subtotal less points redeemed on this order.
    pub fn cashback_eligible_subtotal(&self) -> Decimal {
        (self.subtotal - Decimal::from(self.loyalty_points_used.value())).max(Decimal::ZERO)
    }

    /// Applies an admin status change and returns the previous status.
    ///
    /// Cancelled is terminal. Re-applying the current status is accepted so that
    /// duplicate delivery events reach the accrual guard instead of failing here.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<OrderStatus, OrderError> {
        let previous = self.status;
        if previous == OrderStatus::Cancelled && next != OrderStatus::Cancelled {
            return Err(OrderError::CannotLeaveCancelled);
        }
        self.status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from: previous, to: next }));
        Ok(previous)
    }

    pub fn mark_points_earned(&mut self, points: Points) {
        self.loyalty_points_earned = Some(points);
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::PointsCredited { order_id: self.id, points }));
    }

    pub fn clear_points_earned(&mut self) { self.loyalty_points_earned = None; self.touch(); }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum OrderError { NoItems, InvalidItem(String), PointsExceedSubtotal, CannotLeaveCancelled }
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::InvalidItem(id) => write!(f, "Invalid line item {id}"),
            Self::PointsExceedSubtotal => write!(f, "Redeemed points exceed order subtotal"),
            Self::CannotLeaveCancelled => write!(f, "Cancelled orders cannot change status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, qty: u32, sample: bool) -> LineItem {
        LineItem { product_id: format!("P{price}"), name: "Herbal tea".into(), quantity: qty, unit_price: Decimal::new(price, 0), is_sample: sample }
    }

    #[test]
    fn test_subtotal_excludes_samples() {
        let order = Order::create(Uuid::new_v4(), StoreRegion::China, vec![item(1000, 2, false), item(500, 1, true)], Points::ZERO).unwrap();
        assert_eq!(order.subtotal(), Decimal::new(2000, 0));
    }

    #[test]
    fn test_eligible_subtotal_subtracts_redeemed_points() {
        let order = Order::create(Uuid::new_v4(), StoreRegion::Thailand, vec![item(10_000, 1, false)], Points::new(4_000).unwrap()).unwrap();
        assert_eq!(order.cashback_eligible_subtotal(), Decimal::new(6_000, 0));
    }

    #[test]
    fn test_sample_only_order_has_nothing_eligible() {
        let order = Order::create(Uuid::new_v4(), StoreRegion::Vietnam, vec![item(300, 3, true)], Points::ZERO).unwrap();
        assert_eq!(order.cashback_eligible_subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let user = Uuid::new_v4();
        assert_eq!(Order::create(user, StoreRegion::China, vec![], Points::ZERO).unwrap_err(), OrderError::NoItems);
        assert!(matches!(Order::create(user, StoreRegion::China, vec![item(100, 0, false)], Points::ZERO), Err(OrderError::InvalidItem(_))));
        assert_eq!(
            Order::create(user, StoreRegion::China, vec![item(100, 1, false)], Points::new(101).unwrap()).unwrap_err(),
            OrderError::PointsExceedSubtotal
        );
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        let user = Uuid::new_v4();
        let huge = LineItem { unit_price: Decimal::MAX, ..item(1, 2, false) };
        assert_eq!(
            Order::create(user, StoreRegion::China, vec![huge], Points::ZERO).unwrap_err(),
            OrderError::InvalidItem("P1".into())
        );
        let big = LineItem { product_id: "BIG".into(), unit_price: Decimal::MAX, ..item(1, 1, false) };
        assert_eq!(
            Order::create(user, StoreRegion::China, vec![big.clone(), big], Points::ZERO).unwrap_err(),
            OrderError::InvalidItem("BIG".into())
        );
        // samples never enter the sum, so their price cannot overflow it
        let sample = LineItem { unit_price: Decimal::MAX, ..item(1, 2, true) };
        assert!(Order::create(user, StoreRegion::China, vec![sample, item(100, 1, false)], Points::ZERO).is_ok());
    }

    #[test]
    fn test_status_workflow() {
        let mut order = Order::create(Uuid::new_v4(), StoreRegion::China, vec![item(100, 1, false)], Points::ZERO).unwrap();
        order.take_events();
        assert_eq!(order.transition_to(OrderStatus::Processing).unwrap(), OrderStatus::Pending);
        order.transition_to(OrderStatus::Shipped).unwrap();
        order.transition_to(OrderStatus::Delivered).unwrap();
        assert_eq!(order.transition_to(OrderStatus::Delivered).unwrap(), OrderStatus::Delivered);
        assert_eq!(order.take_events().len(), 4);
        order.transition_to(OrderStatus::Cancelled).unwrap();
        assert_eq!(order.transition_to(OrderStatus::Processing).unwrap_err(), OrderError::CannotLeaveCancelled);
    }
}
