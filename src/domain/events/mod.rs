//! Domain events
use crate::domain::aggregates::order::OrderStatus;
use crate::domain::value_objects::Points;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub enum DomainEvent {
    Order(OrderEvent),
    Loyalty(LoyaltyEvent),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: Uuid },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    PointsCredited { order_id: Uuid, points: Points },
}

#[derive(Clone, Debug, PartialEq)]
pub enum LoyaltyEvent {
    PointsEarned { user_id: Uuid, points: Points, balance: Points },
    PointsSpent { user_id: Uuid, points: Points, balance: Points },
    HistoryTrimmed { user_id: Uuid, evicted: usize },
}
