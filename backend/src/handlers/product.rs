//! Product stock handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::middleware::{Branch, CurrentUser};
use crate::services::product::{ProductService, RestockInput, RestockReceipt};
use crate::AppState;

/// Receive stock for several products
pub async fn restock_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Json(input): Json<RestockInput>,
) -> AppResult<(StatusCode, Json<RestockReceipt>)> {
    let service = ProductService::new(state.db);
    let receipt = service
        .restock(branch_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
