//! Loyalty Account Aggregate
//!
//! Holds a customer's points balance and an append-only audit trail of
//! earn/spend events. Only the most recent [`HISTORY_LIMIT`] entries are kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::value_objects::{Points, UnknownValue};
use crate::domain::events::{DomainEvent, LoyaltyEvent};

/// Maximum number of ledger entries retained per account.
pub const HISTORY_LIMIT: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoyaltyAccount {
    user_id: Uuid,
    points_balance: Points,
    total_earned: Points,
    total_spent: Points,
    history: Vec<LedgerEntry>,
    /// Optimistic concurrency counter. Bumped by the store on every successful save.
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Immutable audit record of a single earn or spend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub points: Points,
    #[serde(rename = "type")]
    pub kind: LedgerEntryType,
    pub description: String,
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryType { Earned, Spent }

impl LedgerEntryType {
    pub fn as_str(&self) -> &'static str { match self { Self::Earned => "earned", Self::Spent => "spent" } }
}

impl FromStr for LedgerEntryType {
    type Err = UnknownValue;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "earned" => Ok(Self::Earned), "spent" => Ok(Self::Spent), other => Err(UnknownValue(other.to_string())) }
    }
}

impl LoyaltyAccount {
    /// Fresh account, created lazily on the first earn or spend. Version 0 means "not yet stored".
    pub fn open(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id, points_balance: Points::ZERO, total_earned: Points::ZERO, total_spent: Points::ZERO,
            history: vec![], version: 0, created_at: now, updated_at: now, events: vec![],
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        user_id: Uuid, points_balance: Points, total_earned: Points, total_spent: Points,
        history: Vec<LedgerEntry>, version: i64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self { user_id, points_balance, total_earned, total_spent, history, version, created_at, updated_at, events: vec![] }
    }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn points_balance(&self) -> Points { self.points_balance }
    pub fn total_earned(&self) -> Points { self.total_earned }
    pub fn total_spent(&self) -> Points { self.total_spent }
    pub fn history(&self) -> &[LedgerEntry] { &self.history }
    pub fn version(&self) -> i64 { self.version }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Called by stores after a successful save.
    pub(crate) fn set_version(&mut self, version: i64) { self.version = version; }

    pub fn earn(&mut self, points: Points, description: impl Into<String>, order_id: Option<Uuid>) -> Result<LedgerEntry, AccountError> {
        if points.is_zero() { return Err(AccountError::ZeroPoints); }
        self.points_balance = self.points_balance.add(points);
        self.total_earned = self.total_earned.add(points);
        let entry = self.append(points, LedgerEntryType::Earned, description.into(), order_id);
        self.raise_event(DomainEvent::Loyalty(LoyaltyEvent::PointsEarned { user_id: self.user_id, points, balance: self.points_balance }));
        Ok(entry)
    }

    pub fn spend(&mut self, points: Points, description: impl Into<String>, order_id: Option<Uuid>) -> Result<LedgerEntry, AccountError> {
        if points.is_zero() { return Err(AccountError::ZeroPoints); }
        self.points_balance = self.points_balance.subtract(points).ok_or(AccountError::InsufficientPoints {
            requested: points, available: self.points_balance,
        })?;
        self.total_spent = self.total_spent.add(points);
        let entry = self.append(points, LedgerEntryType::Spent, description.into(), order_id);
        self.raise_event(DomainEvent::Loyalty(LoyaltyEvent::PointsSpent { user_id: self.user_id, points, balance: self.points_balance }));
        Ok(entry)
    }

    fn append(&mut self, points: Points, kind: LedgerEntryType, description: String, order_id: Option<Uuid>) -> LedgerEntry {
        let entry = LedgerEntry { id: Uuid::new_v4(), points, kind, description, order_id, created_at: Utc::now() };
        self.history.push(entry.clone());
        if self.history.len() > HISTORY_LIMIT {
            let evicted = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..evicted);
            self.raise_event(DomainEvent::Loyalty(LoyaltyEvent::HistoryTrimmed { user_id: self.user_id, evicted }));
        }
        self.updated_at = entry.created_at;
        entry
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountError { ZeroPoints, InsufficientPoints { requested: Points, available: Points } }
impl std::error::Error for AccountError {}
impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPoints => write!(f, "Points must be positive"),
            Self::InsufficientPoints { requested, available } => write!(f, "Insufficient points: requested {requested}, available {available}"),
        }
    }
}
