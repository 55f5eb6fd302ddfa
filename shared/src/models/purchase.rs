//! Supplier purchases paid from a branch account

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AccountRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseTerms {
    pub branch_id: i64,
    pub supplier_id: i64,
    pub purchase_date: NaiveDate,
    pub total_amount: Decimal,
    pub account: AccountRef,
}

/// Incoming stock for one product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockLine {
    pub product_id: i64,
    pub quantity: i64,
}
