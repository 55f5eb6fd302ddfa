//! Customer lookups and due collection

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{plan_due_collection, random_memo, validate_positive};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::services::ledger;

/// Customer service
#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CustomerRecord {
    pub id: i64,
    pub branch_id: i64,
    pub name: String,
    pub mobile: Option<String>,
    pub due_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for collecting part of a customer's due
#[derive(Debug, Clone, Deserialize)]
pub struct CollectDueInput {
    pub amount: Decimal,
    pub account_id: i64,
    pub collected_on: Option<NaiveDate>,
}

/// Outcome of a due collection
#[derive(Debug, Clone, Serialize)]
pub struct DueCollection {
    pub memo_no: String,
    pub customer: CustomerRecord,
}

/// A collection may not take the due below zero. Returning the error drops
/// the transaction, which rolls the collection back.
fn check_remaining_due(remaining: Decimal, collected: Decimal) -> AppResult<()> {
    if remaining < Decimal::ZERO {
        return Err(AppError::Validation {
            field: "amount".to_string(),
            message: format!("exceeds the outstanding due of {}", remaining + collected),
        });
    }
    Ok(())
}

impl CustomerService {
    /// Create a new CustomerService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a customer of the branch
    pub async fn get(&self, branch_id: i64, customer_id: i64) -> AppResult<CustomerRecord> {
        sqlx::query_as::<_, CustomerRecord>(
            "SELECT * FROM customers WHERE id = $1 AND branch_id = $2",
        )
        .bind(customer_id)
        .bind(branch_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer".to_string()))
    }

    /// Collect money against a customer's due into a branch account
    pub async fn collect_due(
        &self,
        branch_id: i64,
        customer_id: i64,
        user_id: i64,
        input: CollectDueInput,
    ) -> AppResult<DueCollection> {
        validate_positive(input.amount, "amount")?;

        let mut tx = self.db.begin().await?;

        // Plain read: row locks are taken by `apply_plan`, accounts before customers.
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1 AND branch_id = $2)",
        )
        .bind(customer_id)
        .bind(branch_id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Customer".to_string()));
        }

        let account = ledger::account_ref(&mut tx, branch_id, input.account_id).await?;
        let memo_no = random_memo();
        let plan = plan_due_collection(
            branch_id,
            customer_id,
            input.amount,
            account,
            input.collected_on.unwrap_or_else(|| Utc::now().date_naive()),
            &memo_no,
        );
        ledger::apply_plan(&mut tx, &plan).await?;

        let customer = sqlx::query_as::<_, CustomerRecord>("SELECT * FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_one(&mut *tx)
            .await?;
        check_remaining_due(customer.due_amount, input.amount)?;

        tx.commit().await?;

        tracing::info!(
            customer_id,
            memo_no = %memo_no,
            user_id,
            amount = %input.amount,
            "customer due collected"
        );
        Ok(DueCollection { memo_no, customer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_collecting_the_whole_due_is_allowed() {
        assert!(check_remaining_due(Decimal::ZERO, dec("800")).is_ok());
        assert!(check_remaining_due(dec("50"), dec("750")).is_ok());
    }

    #[test]
    fn test_over_collection_reports_the_prior_due() {
        match check_remaining_due(dec("-200"), dec("1000")) {
            Err(AppError::Validation { field, message }) => {
                assert_eq!(field, "amount");
                assert!(message.contains("800"));
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }
}
