//! Postgres store. Line items and ledger history live in JSONB columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{LoyaltyStore, OrderStore, StoreError, StoreResult};
use crate::domain::aggregates::{LedgerEntry, LineItem, LoyaltyAccount, Order, OrderStatus};
use crate::domain::value_objects::{Points, StoreRegion};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid, user_id: Uuid, store: String, status: String, items: Json<Vec<LineItem>>,
    loyalty_points_used: i64, loyalty_points_earned: Option<i64>,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> StoreResult<Self> {
        let corrupt = |e: &dyn std::fmt::Display| StoreError::Corrupt(format!("order {}: {e}", r.id));
        let store = r.store.parse::<StoreRegion>().map_err(|e| corrupt(&e))?;
        let status = r.status.parse::<OrderStatus>().map_err(|e| corrupt(&e))?;
        let used = Points::new(r.loyalty_points_used).map_err(|e| corrupt(&e))?;
        let earned = r.loyalty_points_earned.map(Points::new).transpose().map_err(|e| corrupt(&e))?;
        Ok(Order::restore(r.id, r.user_id, store, status, r.items.0, used, earned, r.created_at, r.updated_at))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    user_id: Uuid, points_balance: i64, total_earned: i64, total_spent: i64,
    history: Json<Vec<LedgerEntry>>, version: i64,
    created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for LoyaltyAccount {
    type Error = StoreError;
    fn try_from(r: AccountRow) -> StoreResult<Self> {
        let points = |v: i64| Points::new(v).map_err(|e| StoreError::Corrupt(format!("account {}: {e}", r.user_id)));
        Ok(LoyaltyAccount::restore(
            r.user_id, points(r.points_balance)?, points(r.total_earned)?, points(r.total_spent)?,
            r.history.0, r.version, r.created_at, r.updated_at,
        ))
    }
}

const ORDER_COLUMNS: &str = "id, user_id, store, status, items, loyalty_points_used, loyalty_points_earned, created_at, updated_at";

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, order: &Order) -> StoreResult<()> {
        sqlx::query("INSERT INTO orders (id, user_id, store, status, items, subtotal, loyalty_points_used, loyalty_points_earned, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)")
            .bind(order.id()).bind(order.user_id()).bind(order.store().as_str()).bind(order.status().as_str())
            .bind(Json(order.items())).bind(order.subtotal()).bind(order.loyalty_points_used().value())
            .bind(order.loyalty_points_earned().map(|p| p.value())).bind(order.created_at()).bind(order.updated_at())
            .execute(&self.pool).await?;
        debug!(order_id = %order.id(), "order inserted");
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        row.map(Order::try_from).transpose()
    }

    async fn save_status(&self, order: &Order) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id()).bind(order.status().as_str()).bind(order.updated_at())
            .execute(&self.pool).await?;
        if result.rows_affected() == 0 { return Err(StoreError::MissingOrder(order.id())); }
        Ok(())
    }

    async fn delivered_orders(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND status = 'delivered'"))
            .bind(user_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn claim_points_credit(&self, order_id: Uuid, points: Points) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET loyalty_points_earned = $2, updated_at = NOW() WHERE id = $1 AND loyalty_points_earned IS NULL")
            .bind(order_id).bind(points.value())
            .execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn release_points_credit(&self, order_id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE orders SET loyalty_points_earned = NULL, updated_at = NOW() WHERE id = $1")
            .bind(order_id).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl LoyaltyStore for PgStore {
    async fn get_account(&self, user_id: Uuid) -> StoreResult<Option<LoyaltyAccount>> {
        let row = sqlx::query_as::<_, AccountRow>("SELECT user_id, points_balance, total_earned, total_spent, history, version, created_at, updated_at FROM loyalty_accounts WHERE user_id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?;
        row.map(LoyaltyAccount::try_from).transpose()
    }

    async fn save_account(&self, account: &LoyaltyAccount) -> StoreResult<i64> {
        let result = if account.version() == 0 {
            sqlx::query("INSERT INTO loyalty_accounts (user_id, points_balance, total_earned, total_spent, history, version, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, 1, $6, $7) ON CONFLICT (user_id) DO NOTHING")
                .bind(account.user_id()).bind(account.points_balance().value()).bind(account.total_earned().value())
                .bind(account.total_spent().value()).bind(Json(account.history())).bind(account.created_at()).bind(account.updated_at())
                .execute(&self.pool).await?
        } else {
            sqlx::query("UPDATE loyalty_accounts SET points_balance = $3, total_earned = $4, total_spent = $5, history = $6, version = version + 1, updated_at = $7 WHERE user_id = $1 AND version = $2")
                .bind(account.user_id()).bind(account.version()).bind(account.points_balance().value()).bind(account.total_earned().value())
                .bind(account.total_spent().value()).bind(Json(account.history())).bind(account.updated_at())
                .execute(&self.pool).await?
        };
        if result.rows_affected() == 0 { return Err(StoreError::VersionConflict(account.user_id())); }
        Ok(account.version() + 1)
    }
}
