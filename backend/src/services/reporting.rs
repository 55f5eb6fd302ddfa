//! Reporting service for the daily rollups and the ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{DateRange, TopSheet, TopSheetDelta};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

/// Stored top sheet row
#[derive(Debug, Clone, FromRow)]
struct TopSheetRow {
    sheet_date: NaiveDate,
    branch_id: i64,
    pending: i64,
    checkout: i64,
    delivery: i64,
    cancelled: i64,
    order_count: i64,
    ready_made: i64,
    cash: Decimal,
    bank: Decimal,
    expense: Decimal,
}

impl From<TopSheetRow> for TopSheet {
    fn from(row: TopSheetRow) -> Self {
        TopSheet {
            sheet_date: row.sheet_date,
            branch_id: row.branch_id,
            totals: TopSheetDelta {
                pending: row.pending,
                checkout: row.checkout,
                delivery: row.delivery,
                cancelled: row.cancelled,
                order_count: row.order_count,
                ready_made: row.ready_made,
                cash: row.cash,
                bank: row.bank,
                expense: row.expense,
            },
        }
    }
}

/// One day of the branch report, flat so it exports as CSV
#[derive(Debug, Clone, Serialize)]
pub struct BranchReportLine {
    pub sheet_date: NaiveDate,
    pub branch_id: i64,
    pub pending: i64,
    pub checkout: i64,
    pub delivery: i64,
    pub cancelled: i64,
    pub order_count: i64,
    pub ready_made: i64,
    pub cash: Decimal,
    pub bank: Decimal,
    pub expense: Decimal,
    pub total_amount: Decimal,
    pub balance: Decimal,
}

impl From<TopSheet> for BranchReportLine {
    fn from(sheet: TopSheet) -> Self {
        let total_amount = sheet.total_amount();
        let balance = sheet.balance();
        let t = sheet.totals;
        BranchReportLine {
            sheet_date: sheet.sheet_date,
            branch_id: sheet.branch_id,
            pending: t.pending,
            checkout: t.checkout,
            delivery: t.delivery,
            cancelled: t.cancelled,
            order_count: t.order_count,
            ready_made: t.ready_made,
            cash: t.cash,
            bank: t.bank,
            expense: t.expense,
            total_amount,
            balance,
        }
    }
}

/// Stored employee progress row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProgressRecord {
    pub sheet_date: NaiveDate,
    pub branch_id: i64,
    pub employee_id: i64,
    pub sale_amount: Decimal,
    pub sale_return_amount: Decimal,
    pub order_count: i64,
    pub item_count: i64,
    pub production_units: i64,
    pub overtime_hours: i64,
    pub advance_payment: Decimal,
    pub salary: Decimal,
}

/// Ledger entry as stored
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub branch_id: i64,
    pub memo_no: String,
    pub from_id: i64,
    pub from_entity: String,
    pub to_id: i64,
    pub to_entity: String,
    pub amount: Decimal,
    pub transaction_type: String,
    pub transaction_date: NaiveDate,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

fn check_range(range: &DateRange) -> AppResult<()> {
    if !range.is_valid() {
        return Err(AppError::Validation {
            field: "start".to_string(),
            message: "must not be after end".to_string(),
        });
    }
    Ok(())
}

impl ReportingService {
    /// Create a new ReportingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Top sheet rows of a branch over an inclusive date range
    pub async fn branch_report(&self, branch_id: i64, range: DateRange) -> AppResult<Vec<BranchReportLine>> {
        check_range(&range)?;

        let rows = sqlx::query_as::<_, TopSheetRow>(
            r#"
            SELECT sheet_date, branch_id, pending, checkout, delivery, cancelled,
                   order_count, ready_made, cash, bank, expense
            FROM top_sheet
            WHERE branch_id = $1 AND sheet_date BETWEEN $2 AND $3
            ORDER BY sheet_date
            "#,
        )
        .bind(branch_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| BranchReportLine::from(TopSheet::from(row)))
            .collect())
    }

    /// Progress rows of a branch over a date range, optionally for one employee
    pub async fn employee_progress(
        &self,
        branch_id: i64,
        range: DateRange,
        employee_id: Option<i64>,
    ) -> AppResult<Vec<ProgressRecord>> {
        check_range(&range)?;

        let rows = sqlx::query_as::<_, ProgressRecord>(
            r#"
            SELECT sheet_date, branch_id, employee_id, sale_amount, sale_return_amount,
                   order_count, item_count, production_units, overtime_hours,
                   advance_payment, salary
            FROM employees_progress
            WHERE branch_id = $1
              AND sheet_date BETWEEN $2 AND $3
              AND ($4::BIGINT IS NULL OR employee_id = $4)
            ORDER BY sheet_date, employee_id
            "#,
        )
        .bind(branch_id)
        .bind(range.start)
        .bind(range.end)
        .bind(employee_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Ledger entries recorded against a memo number
    pub async fn transactions_by_memo(&self, branch_id: i64, memo_no: &str) -> AppResult<Vec<TransactionRecord>> {
        let rows = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT * FROM transactions
            WHERE branch_id = $1 AND memo_no = $2
            ORDER BY id
            "#,
        )
        .bind(branch_id)
        .bind(memo_no)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
