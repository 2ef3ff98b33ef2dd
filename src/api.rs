//! HTTP surface: order status handler, checkout and loyalty lookups.

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{AccountError, LineItem, LoyaltyAccount, Order, OrderStatus};
use crate::domain::loyalty::TierProgress;
use crate::domain::value_objects::{Points, StoreRegion};
use crate::service::{OrderService, StatusUpdate};
use crate::LoyaltyError;

#[derive(Clone)] pub struct AppState { pub service: Arc<OrderService> }

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "tcm-store-loyalty"})) }))
        .route("/api/v1/orders", post(place_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/status", put(update_status))
        .route("/api/v1/loyalty/:user_id", get(get_account))
        .route("/api/v1/loyalty/:user_id/tier", get(get_tier))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: LoyaltyError) -> (StatusCode, String) {
    let status = match &e {
        LoyaltyError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        LoyaltyError::InvalidOrder(_) | LoyaltyError::InvalidPoints(_) => StatusCode::BAD_REQUEST,
        LoyaltyError::Account(AccountError::InsufficientPoints { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        LoyaltyError::Account(_) => StatusCode::BAD_REQUEST,
        LoyaltyError::Conflict(_) => StatusCode::CONFLICT,
        LoyaltyError::InvalidTiers(_) | LoyaltyError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    pub user_id: Uuid,
    pub store: StoreRegion,
    #[validate(length(min = 1))]
    pub items: Vec<LineItem>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub loyalty_points_used: i64,
}

#[derive(Debug, Deserialize)] pub struct UpdateStatusRequest { pub status: OrderStatus }

async fn place_order(State(s): State<AppState>, Json(r): Json<PlaceOrderRequest>) -> ApiResult<(StatusCode, Json<Order>)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let points = Points::new(r.loyalty_points_used).map_err(|e| reject(e.into()))?;
    let order = s.service.place_order(r.user_id, r.store, r.items, points).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Order>> {
    s.service.order(id).await.map(Json).map_err(reject)
}

async fn update_status(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<UpdateStatusRequest>) -> ApiResult<Json<StatusUpdate>> {
    s.service.update_status(id, r.status).await.map(Json).map_err(reject)
}

async fn get_account(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> ApiResult<Json<LoyaltyAccount>> {
    s.service.account(user_id).await.map(Json).map_err(reject)
}

async fn get_tier(State(s): State<AppState>, Path(user_id): Path<Uuid>) -> Json<TierProgress> {
    Json(s.service.tier_status(user_id).await)
}
