//! Sale HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::middleware::{Branch, CurrentUser};
use crate::services::sale::{SaleInput, SaleService, SaleWithItems};
use crate::AppState;

/// Record a sale
pub async fn create_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Json(input): Json<SaleInput>,
) -> AppResult<(StatusCode, Json<SaleWithItems>)> {
    let service = SaleService::new(state.db);
    let sale = service.create(branch_id, current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

/// Rewrite a sale
pub async fn update_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Path(memo_no): Path<String>,
    Json(input): Json<SaleInput>,
) -> AppResult<Json<SaleWithItems>> {
    let service = SaleService::new(state.db);
    let sale = service
        .update(branch_id, &memo_no, current_user.0.user_id, input)
        .await?;
    Ok(Json(sale))
}

/// Get a sale with its items
pub async fn get_sale(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Path(memo_no): Path<String>,
) -> AppResult<Json<SaleWithItems>> {
    let service = SaleService::new(state.db);
    Ok(Json(service.get(branch_id, &memo_no).await?))
}
