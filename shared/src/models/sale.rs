//! Immediate retail sales

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AccountRef;

/// One sold product line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: i64,
    pub quantity: i64,
    pub total_price: Decimal,
}

/// Header terms of a sale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTerms {
    pub branch_id: i64,
    pub sale_date: NaiveDate,
    pub customer_id: i64,
    pub salesperson_id: i64,
    pub payment_account: Option<AccountRef>,
    pub total_payable: Decimal,
    pub paid_amount: Decimal,
}

impl SaleTerms {
    /// What the customer still owes on this sale
    pub fn due(&self) -> Decimal {
        (self.total_payable - self.paid_amount).max(Decimal::ZERO)
    }
}

/// A sale as the engine sees it: header plus its lines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub memo_no: String,
    pub terms: SaleTerms,
    pub lines: Vec<SaleLine>,
}

impl Sale {
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}
