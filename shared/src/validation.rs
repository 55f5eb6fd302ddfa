//! Domain validation for lifecycle requests
//!
//! These checks run before any database transaction is opened.

use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::models::{OrderLine, RestockLine, SaleLine};

/// A request field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: &'static str,
}

impl ValidationError {
    pub fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

// ============================================================================
// Money
// ============================================================================

/// Largest amount a `NUMERIC(14, 2)` column holds
/// (999,999,999,999.99)
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Money is stored in whole cents
fn validate_cents(amount: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if amount.normalize().scale() > 2 {
        return Err(ValidationError::new(field, "must have at most 2 decimal places"));
    }
    if amount.abs() > MAX_AMOUNT {
        return Err(ValidationError::new(field, "is too large"));
    }
    Ok(())
}

/// Validate that an amount is zero or more
pub fn validate_non_negative(amount: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::new(field, "must not be negative"));
    }
    validate_cents(amount, field)
}

/// Validate that an amount is strictly positive
pub fn validate_positive(amount: Decimal, field: &'static str) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }
    validate_cents(amount, field)
}

/// A collected amount needs an account to land in
pub fn validate_payment(
    amount: Decimal,
    account_id: Option<i64>,
    field: &'static str,
) -> Result<(), ValidationError> {
    validate_non_negative(amount, field)?;
    if amount > Decimal::ZERO && account_id.is_none() {
        return Err(ValidationError::new(
            "payment_account_id",
            "is required when a payment is collected",
        ));
    }
    Ok(())
}

// ============================================================================
// Lines
// ============================================================================

fn check_lines<I>(lines: I) -> Result<(), ValidationError>
where
    I: IntoIterator<Item = (i64, i64, Decimal)>,
{
    let mut seen = BTreeSet::new();
    let mut any = false;
    let mut total_quantity: i64 = 0;
    for (product_id, quantity, amount) in lines {
        any = true;
        if quantity <= 0 {
            return Err(ValidationError::new("items.quantity", "must be at least 1"));
        }
        total_quantity = total_quantity
            .checked_add(quantity)
            .ok_or_else(|| ValidationError::new("items.quantity", "total quantity is too large"))?;
        validate_non_negative(amount, "items.amount")?;
        if !seen.insert(product_id) {
            return Err(ValidationError::new(
                "items.product_id",
                "each product may appear only once",
            ));
        }
    }
    if !any {
        return Err(ValidationError::new("items", "at least one item is required"));
    }
    Ok(())
}

/// Validate order lines: non-empty, positive quantities, one line per product
pub fn validate_order_lines(lines: &[OrderLine]) -> Result<(), ValidationError> {
    check_lines(lines.iter().map(|l| (l.product_id, l.quantity, l.subtotal)))
}

/// Validate sold lines with the same rules as order lines
pub fn validate_sale_lines(lines: &[SaleLine]) -> Result<(), ValidationError> {
    check_lines(lines.iter().map(|l| (l.product_id, l.quantity, l.total_price)))
}

/// Validate restock lines
pub fn validate_restock_lines(lines: &[RestockLine]) -> Result<(), ValidationError> {
    check_lines(lines.iter().map(|l| (l.product_id, l.quantity, Decimal::ZERO)))
}

// ============================================================================
// Requests
// ============================================================================

/// Validate the money terms of an order or sale
pub fn validate_order_amounts(
    total_payable: Decimal,
    advance_payment: Decimal,
    account_id: Option<i64>,
) -> Result<(), ValidationError> {
    validate_non_negative(total_payable, "total_payable")?;
    validate_payment(advance_payment, account_id, "advance_payment")
}

/// Validate a delivery request before it reaches the lifecycle engine
pub fn validate_delivery(
    items: i64,
    paid: Decimal,
    account_id: Option<i64>,
) -> Result<(), ValidationError> {
    if items < 0 {
        return Err(ValidationError::new("items", "must not be negative"));
    }
    validate_payment(paid, account_id, "paid")?;
    if items == 0 && paid.is_zero() {
        return Err(ValidationError::new(
            "items",
            "deliver at least one item or collect a payment",
        ));
    }
    Ok(())
}

/// Validate a caller supplied memo number: 1 to 32 characters of letters,
/// digits and dashes
pub fn validate_memo_no(memo_no: &str) -> Result<(), ValidationError> {
    if memo_no.is_empty() || memo_no.len() > 32 {
        return Err(ValidationError::new(
            "memo_no",
            "must be between 1 and 32 characters",
        ));
    }
    if !memo_no.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::new(
            "memo_no",
            "may contain only letters, digits and dashes",
        ));
    }
    Ok(())
}
