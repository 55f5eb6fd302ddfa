//! Product stock receipts

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{plan_restock, random_memo, validate_memo_no, validate_restock_lines, RestockLine};
use sqlx::PgPool;

use crate::error::AppResult;
use crate::services::ledger;

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RestockInput {
    pub received_on: Option<NaiveDate>,
    pub memo_no: Option<String>,
    pub items: Vec<RestockLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestockReceipt {
    pub memo_no: String,
    pub received_on: NaiveDate,
    pub products: usize,
    pub units: i64,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Add received quantities to stock and register each line
    pub async fn restock(&self, branch_id: i64, user_id: i64, input: RestockInput) -> AppResult<RestockReceipt> {
        validate_restock_lines(&input.items)?;
        if let Some(memo_no) = &input.memo_no {
            validate_memo_no(memo_no)?;
        }
        let memo_no = input.memo_no.unwrap_or_else(random_memo);
        let received_on = input.received_on.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        for line in &input.items {
            sqlx::query(
                r#"
                INSERT INTO product_stock_registry (branch_id, memo_no, product_id, quantity, received_on, created_by)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(branch_id)
            .bind(&memo_no)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(received_on)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        ledger::apply_plan(&mut tx, &plan_restock(&input.items)).await?;

        tx.commit().await?;

        let units = input.items.iter().map(|l| l.quantity).sum();
        tracing::info!(memo_no = %memo_no, branch_id, user_id, units, "products restocked");
        Ok(RestockReceipt {
            memo_no,
            received_on,
            products: input.items.len(),
            units,
        })
    }
}
