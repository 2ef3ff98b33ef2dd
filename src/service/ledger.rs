//! Loyalty ledger updates.
//!
//! Every change is an optimistic read-modify-write of the account: load (or
//! open lazily), apply, save against the version that was read. A concurrent
//! writer makes the save fail with a version conflict and the whole cycle is
//! repeated, up to [`MAX_ATTEMPTS`] times.

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::aggregates::{LedgerEntry, LedgerEntryType, LoyaltyAccount};
use crate::domain::events::{DomainEvent, LoyaltyEvent};
use crate::domain::value_objects::Points;
use crate::repository::{LoyaltyStore, StoreError};
use crate::Result;

pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct LedgerUpdater {
    accounts: Arc<dyn LoyaltyStore>,
}

impl LedgerUpdater {
    pub fn new(accounts: Arc<dyn LoyaltyStore>) -> Self { Self { accounts } }

    pub async fn earn(&self, user_id: Uuid, points: Points, description: &str, order_id: Option<Uuid>) -> Result<LedgerEntry> {
        self.apply(user_id, LedgerEntryType::Earned, points, description, order_id).await
    }

    pub async fn spend(&self, user_id: Uuid, points: Points, description: &str, order_id: Option<Uuid>) -> Result<LedgerEntry> {
        self.apply(user_id, LedgerEntryType::Spent, points, description, order_id).await
    }

    /// Stored account, or an empty unsaved one for users who never earned or spent.
    pub async fn account(&self, user_id: Uuid) -> Result<LoyaltyAccount> {
        Ok(self.accounts.get_account(user_id).await?.unwrap_or_else(|| LoyaltyAccount::open(user_id)))
    }

    async fn apply(&self, user_id: Uuid, kind: LedgerEntryType, points: Points, description: &str, order_id: Option<Uuid>) -> Result<LedgerEntry> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut account = self.account(user_id).await?;
            let entry = match kind {
                LedgerEntryType::Earned => account.earn(points, description, order_id)?,
                LedgerEntryType::Spent => account.spend(points, description, order_id)?,
            };
            match self.accounts.save_account(&account).await {
                Ok(version) => {
                    log_events(account.take_events(), version);
                    return Ok(entry);
                }
                Err(StoreError::VersionConflict(_)) if attempt < MAX_ATTEMPTS => {
                    debug!(%user_id, attempt, "Loyalty account changed underneath us, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn log_events(events: Vec<DomainEvent>, version: i64) {
    for event in events {
        match event {
            DomainEvent::Loyalty(LoyaltyEvent::PointsEarned { user_id, points, balance }) => info!(%user_id, %points, %balance, version, "Loyalty points earned"),
            DomainEvent::Loyalty(LoyaltyEvent::PointsSpent { user_id, points, balance }) => info!(%user_id, %points, %balance, version, "Loyalty points spent"),
            DomainEvent::Loyalty(LoyaltyEvent::HistoryTrimmed { user_id, evicted }) => debug!(%user_id, evicted, "Ledger history trimmed"),
            DomainEvent::Order(_) => {}
        }
    }
}
