//! Salary and worker progress service

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    plan_salary, plan_worker_progress, random_memo, validate_non_negative, validate_positive,
    SalaryPayment, WorkerProgress,
};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::services::reporting::ProgressRecord;

/// Employee service
#[derive(Clone)]
pub struct EmployeeService {
    db: PgPool,
}

/// Input for paying a salary. Without an account the branch cash account pays.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SalaryInput {
    #[validate(range(min = 1))]
    pub employee_id: i64,
    pub amount: Decimal,
    pub paid_on: Option<NaiveDate>,
    pub account_id: Option<i64>,
}

/// What a salary payment posted
#[derive(Debug, Clone, Serialize)]
pub struct SalaryReceipt {
    pub memo_no: String,
    pub employee_id: i64,
    pub amount: Decimal,
    pub paid_on: NaiveDate,
    pub account_id: i64,
}

/// Input for a worker's daily production figures
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProgressInput {
    #[validate(range(min = 1))]
    pub employee_id: i64,
    pub work_date: NaiveDate,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub production_units: i64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub overtime_hours: i64,
    #[serde(default)]
    pub advance_payment: Decimal,
}

async fn ensure_employee(conn: &mut PgConnection, branch_id: i64, employee_id: i64) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE id = $1 AND branch_id = $2)",
    )
    .bind(employee_id)
    .bind(branch_id)
    .fetch_one(&mut *conn)
    .await?;

    if !exists {
        return Err(AppError::ReferenceNotFound(format!("employee {}", employee_id)));
    }
    Ok(())
}

impl EmployeeService {
    /// Create a new EmployeeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Pay a salary from a branch account
    pub async fn submit_salary(&self, branch_id: i64, user_id: i64, input: SalaryInput) -> AppResult<SalaryReceipt> {
        input.validate()?;
        validate_positive(input.amount, "amount")?;

        let mut tx = self.db.begin().await?;

        ensure_employee(&mut tx, branch_id, input.employee_id).await?;
        let account = ledger::account_or_cash(&mut tx, branch_id, input.account_id).await?;
        let payment = SalaryPayment {
            branch_id,
            employee_id: input.employee_id,
            amount: input.amount,
            paid_on: input.paid_on.unwrap_or_else(|| Utc::now().date_naive()),
            account,
            memo_no: random_memo(),
        };
        ledger::apply_plan(&mut tx, &plan_salary(&payment)).await?;

        tx.commit().await?;

        tracing::info!(
            employee_id = payment.employee_id,
            memo_no = %payment.memo_no,
            branch_id,
            user_id,
            amount = %payment.amount,
            "salary paid"
        );
        Ok(SalaryReceipt {
            memo_no: payment.memo_no,
            employee_id: payment.employee_id,
            amount: payment.amount,
            paid_on: payment.paid_on,
            account_id: account.id,
        })
    }

    /// Add a worker's figures to the day's progress row and return the row
    pub async fn record_progress(&self, branch_id: i64, input: ProgressInput) -> AppResult<ProgressRecord> {
        input.validate()?;
        validate_non_negative(input.advance_payment, "advance_payment")?;

        let progress = WorkerProgress {
            branch_id,
            employee_id: input.employee_id,
            work_date: input.work_date,
            production_units: input.production_units,
            overtime_hours: input.overtime_hours,
            advance_payment: input.advance_payment,
        };
        let plan = plan_worker_progress(&progress);
        if plan.is_empty() {
            return Err(AppError::ValidationError(
                "progress must record at least one figure".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;

        ensure_employee(&mut tx, branch_id, progress.employee_id).await?;
        ledger::apply_plan(&mut tx, &plan).await?;

        let row = sqlx::query_as::<_, ProgressRecord>(
            r#"
            SELECT sheet_date, branch_id, employee_id, sale_amount, sale_return_amount,
                   order_count, item_count, production_units, overtime_hours,
                   advance_payment, salary
            FROM employees_progress
            WHERE sheet_date = $1 AND employee_id = $2
            "#,
        )
        .bind(progress.work_date)
        .bind(progress.employee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Progress".to_string()))?;

        tx.commit().await?;

        tracing::debug!(employee_id = progress.employee_id, date = %progress.work_date, "worker progress recorded");
        Ok(row)
    }
}
