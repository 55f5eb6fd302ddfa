//! Reporting handlers for the daily rollups and the ledger

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::DateRange;

use crate::error::AppResult;
use crate::middleware::Branch;
use crate::services::reporting::{ReportingService, TransactionRecord};
use crate::AppState;

#[derive(Deserialize)]
pub struct ReportQuery {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub employee_id: Option<i64>,
    pub format: Option<String>, // "json" or "csv"
}

impl ReportQuery {
    fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }

    fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

#[derive(Deserialize)]
pub struct LedgerQuery {
    pub memo_no: String,
}

fn respond<T: Serialize>(data: Vec<T>, csv: bool, filename: &str) -> AppResult<Response> {
    if csv {
        let body = ReportingService::export_to_csv(&data)?;
        let disposition = format!("attachment; filename=\"{}\"", filename);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Branch top sheet over a date range
pub async fn branch_report(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let service = ReportingService::new(state.db);
    let data = service.branch_report(branch_id, query.range()).await?;
    respond(data, query.wants_csv(), "top_sheet.csv")
}

/// Employee progress over a date range
pub async fn employee_progress_report(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    let service = ReportingService::new(state.db);
    let data = service
        .employee_progress(branch_id, query.range(), query.employee_id)
        .await?;
    respond(data, query.wants_csv(), "employee_progress.csv")
}

/// Ledger entries for a memo number
pub async fn transactions_by_memo(
    State(state): State<AppState>,
    Branch(branch_id): Branch,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<Vec<TransactionRecord>>> {
    let service = ReportingService::new(state.db);
    Ok(Json(service.transactions_by_memo(branch_id, &query.memo_no).await?))
}
