//! Order lifecycle HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::OrderStatus;

use crate::error::AppResult;
use crate::middleware::{Branch, CurrentUser};
use crate::services::order::{
    DeliveryInput, OrderInput, OrderItemRecord, OrderRecord, OrderService, OrderWithItems,
};
use crate::AppState;

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<OrderStatus>,
}

#[derive(Deserialize)]
pub struct MemoQuery {
    pub memo_no: String,
}

/// Create a pending order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Json(input): Json<OrderInput>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    let service = OrderService::new(state.db);
    let order = service.create(branch_id, current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Edit a pending order
pub async fn update_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Path(order_id): Path<i64>,
    Json(input): Json<OrderInput>,
) -> AppResult<Json<OrderWithItems>> {
    let service = OrderService::new(state.db);
    let order = service
        .update(branch_id, order_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(order))
}

/// Get an order with its items
pub async fn get_order(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Path(order_id): Path<i64>,
) -> AppResult<Json<OrderWithItems>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.get(branch_id, order_id).await?))
}

/// List orders, optionally by status
pub async fn list_orders(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<Vec<OrderRecord>>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.list(branch_id, query.status).await?))
}

/// Items of an order by memo number
pub async fn get_order_items(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Query(query): Query<MemoQuery>,
) -> AppResult<Json<Vec<OrderItemRecord>>> {
    let service = OrderService::new(state.db);
    Ok(Json(service.items_by_memo(branch_id, &query.memo_no).await?))
}

/// Move an order to checkout
pub async fn checkout_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Path(order_id): Path<i64>,
) -> AppResult<Json<OrderRecord>> {
    let service = OrderService::new(state.db);
    let order = service
        .checkout(branch_id, order_id, current_user.0.user_id)
        .await?;
    Ok(Json(order))
}

/// Confirm a (partial) delivery
pub async fn confirm_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Path(order_id): Path<i64>,
    Json(input): Json<DeliveryInput>,
) -> AppResult<Json<OrderRecord>> {
    let service = OrderService::new(state.db);
    let order = service
        .deliver(branch_id, order_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(order))
}

/// Cancel an order
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Path(order_id): Path<i64>,
) -> AppResult<Json<OrderRecord>> {
    let service = OrderService::new(state.db);
    let order = service
        .cancel(branch_id, order_id, current_user.0.user_id)
        .await?;
    Ok(Json(order))
}
