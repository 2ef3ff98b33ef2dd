//! Order status notifications (email and push).
//!
//! Delivery is handed off to a NATS subject per channel; the email and push
//! workers that subscribe there are separate services.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::{Points, StoreRegion};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel { Email, Push }

impl Channel {
    pub fn subject(&self) -> &'static str {
        match self { Self::Email => "notifications.email", Self::Push => "notifications.push" }
    }
}

/// Channels a customer is notified on when their order enters `status`.
pub fn channels_for(status: OrderStatus) -> &'static [Channel] {
    match status {
        OrderStatus::Pending => &[],
        OrderStatus::Processing | OrderStatus::Cancelled => &[Channel::Email],
        OrderStatus::Shipped | OrderStatus::Delivered => &[Channel::Email, Channel::Push],
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusNotification {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub store: StoreRegion,
    pub status: OrderStatus,
    pub points_earned: Option<Points>,
}

impl StatusNotification {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id(), user_id: order.user_id(), store: order.store(),
            status: order.status(), points_earned: order.loyalty_points_earned(),
        }
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to publish notification: {0}")]
    Publish(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel: Channel, notification: &StatusNotification) -> Result<(), NotifyError>;
}

pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn send(&self, channel: Channel, notification: &StatusNotification) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(notification)?;
        self.client.publish(channel.subject().to_string(), payload.into()).await
            .map_err(|e| NotifyError::Publish(e.to_string()))
    }
}

/// Used when no NATS server is configured. Notifications only reach the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, channel: Channel, notification: &StatusNotification) -> Result<(), NotifyError> {
        info!(subject = channel.subject(), order_id = %notification.order_id, status = %notification.status, "Notification (log only)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_fan_out() {
        assert!(channels_for(OrderStatus::Pending).is_empty());
        assert_eq!(channels_for(OrderStatus::Processing), &[Channel::Email]);
        assert_eq!(channels_for(OrderStatus::Delivered), &[Channel::Email, Channel::Push]);
        assert_eq!(channels_for(OrderStatus::Cancelled), &[Channel::Email]);
    }

    #[test]
    fn test_payload_shape() {
        let n = StatusNotification {
            order_id: Uuid::nil(), user_id: Uuid::nil(), store: StoreRegion::Vietnam,
            status: OrderStatus::Shipped, points_earned: None,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["store"], "vietnam");
        assert_eq!(json["status"], "shipped");
        assert!(json["points_earned"].is_null());
    }
}
