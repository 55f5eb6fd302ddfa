//! Salary and worker progress handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::middleware::{Branch, CurrentUser};
use crate::services::employee::{EmployeeService, ProgressInput, SalaryInput, SalaryReceipt};
use crate::services::reporting::ProgressRecord;
use crate::AppState;

/// Pay a salary
pub async fn submit_salary(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Branch(branch_id): Branch,
    Json(input): Json<SalaryInput>,
) -> AppResult<(StatusCode, Json<SalaryReceipt>)> {
    let service = EmployeeService::new(state.db);
    let receipt = service
        .submit_salary(branch_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Record worker progress
pub async fn record_progress(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Json(input): Json<ProgressInput>,
) -> AppResult<Json<ProgressRecord>> {
    let service = EmployeeService::new(state.db);
    Ok(Json(service.record_progress(branch_id, input).await?))
}
