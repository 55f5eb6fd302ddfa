//! Salary payments and worker production progress

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AccountRef;

/// A salary paid out of a branch account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryPayment {
    pub branch_id: i64,
    pub employee_id: i64,
    pub amount: Decimal,
    pub paid_on: NaiveDate,
    pub account: AccountRef,
    pub memo_no: String,
}

/// Production figures a worker reports for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerProgress {
    pub branch_id: i64,
    pub employee_id: i64,
    pub work_date: NaiveDate,
    pub production_units: i64,
    pub overtime_hours: i64,
    pub advance_payment: Decimal,
}
