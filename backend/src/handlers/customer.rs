//! Customer and account handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::{Branch, CurrentUser};
use crate::services::account::{AccountRecord, AccountService};
use crate::services::customer::{CollectDueInput, CustomerRecord, CustomerService, DueCollection};
use crate::AppState;

/// Get a customer
pub async fn get_customer(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Path(customer_id): Path<i64>,
) -> AppResult<Json<CustomerRecord>> {
    let service = CustomerService::new(state.db);
    Ok(Json(service.get(branch_id, customer_id).await?))
}

/// Collect part of a customer's due
pub async fn collect_due(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Path(customer_id): Path<i64>,
    Json(input): Json<CollectDueInput>,
) -> AppResult<Json<DueCollection>> {
    let service = CustomerService::new(state.db);
    let collection = service
        .collect_due(branch_id, customer_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(collection))
}

/// List the branch's accounts
pub async fn list_accounts(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
) -> AppResult<Json<Vec<AccountRecord>>> {
    let service = AccountService::new(state.db);
    Ok(Json(service.list(branch_id).await?))
}
