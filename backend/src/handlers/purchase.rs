//! Purchase HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::AppResult;
use crate::middleware::{Branch, CurrentUser};
use crate::services::purchase::{PurchaseInput, PurchaseRecord, PurchaseService};
use crate::AppState;

/// Record a purchase
pub async fn create_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Json(input): Json<PurchaseInput>,
) -> AppResult<(StatusCode, Json<PurchaseRecord>)> {
    let service = PurchaseService::new(state.db);
    let purchase = service.create(branch_id, current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// Correct a purchase
pub async fn update_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Path(purchase_id): Path<i64>,
    Json(input): Json<PurchaseInput>,
) -> AppResult<Json<PurchaseRecord>> {
    let service = PurchaseService::new(state.db);
    let purchase = service
        .update(branch_id, purchase_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(purchase))
}
