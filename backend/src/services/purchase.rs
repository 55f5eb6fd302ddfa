//! Supplier purchase service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{plan_purchase, plan_purchase_update, validate_memo_no, validate_positive, PurchaseTerms};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::services::memo::{resolve_memo_no, MemoSeries};

/// Purchase service
#[derive(Clone)]
pub struct PurchaseService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseRecord {
    pub id: i64,
    pub branch_id: i64,
    pub memo_no: String,
    pub supplier_id: i64,
    pub purchase_date: NaiveDate,
    pub total_amount: Decimal,
    pub account_id: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for recording or correcting a purchase. Without an account the
/// branch cash account pays.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PurchaseInput {
    pub memo_no: Option<String>,
    #[validate(range(min = 1))]
    pub supplier_id: i64,
    pub purchase_date: NaiveDate,
    pub total_amount: Decimal,
    pub account_id: Option<i64>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl PurchaseInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(memo_no) = &self.memo_no {
            validate_memo_no(memo_no)?;
        }
        validate_positive(self.total_amount, "total_amount")?;
        Ok(())
    }
}

impl PurchaseService {
    /// Create a new PurchaseService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a purchase paid from a branch account
    pub async fn create(&self, branch_id: i64, user_id: i64, input: PurchaseInput) -> AppResult<PurchaseRecord> {
        input.check()?;
        let memo_no =
            resolve_memo_no(&self.db, MemoSeries::Purchases, branch_id, input.memo_no.clone()).await;

        let mut tx = self.db.begin().await?;

        let account = ledger::account_or_cash(&mut tx, branch_id, input.account_id).await?;
        let terms = PurchaseTerms {
            branch_id,
            supplier_id: input.supplier_id,
            purchase_date: input.purchase_date,
            total_amount: input.total_amount,
            account,
        };
        let plan = plan_purchase(&memo_no, &terms);

        let purchase = sqlx::query_as::<_, PurchaseRecord>(
            r#"
            INSERT INTO purchases (
                branch_id, memo_no, supplier_id, purchase_date, total_amount,
                account_id, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(branch_id)
        .bind(&memo_no)
        .bind(terms.supplier_id)
        .bind(terms.purchase_date)
        .bind(terms.total_amount)
        .bind(account.id)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from(e).on_duplicate("memo_no"))?;

        ledger::apply_plan(&mut tx, &plan).await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id = purchase.id,
            memo_no = %purchase.memo_no,
            branch_id,
            user_id,
            total = %purchase.total_amount,
            "purchase recorded"
        );
        Ok(purchase)
    }

    /// Correct a purchase; only the difference is posted
    pub async fn update(
        &self,
        branch_id: i64,
        purchase_id: i64,
        user_id: i64,
        input: PurchaseInput,
    ) -> AppResult<PurchaseRecord> {
        input.check()?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, PurchaseRecord>(
            "SELECT * FROM purchases WHERE id = $1 AND branch_id = $2 FOR UPDATE",
        )
        .bind(purchase_id)
        .bind(branch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase".to_string()))?;

        let old_account = ledger::account_ref(&mut tx, branch_id, current.account_id).await?;
        let new_account = match input.account_id {
            Some(id) => ledger::account_ref(&mut tx, branch_id, id).await?,
            None => old_account,
        };
        let old = PurchaseTerms {
            branch_id,
            supplier_id: current.supplier_id,
            purchase_date: current.purchase_date,
            total_amount: current.total_amount,
            account: old_account,
        };
        let new = PurchaseTerms {
            branch_id,
            supplier_id: input.supplier_id,
            purchase_date: input.purchase_date,
            total_amount: input.total_amount,
            account: new_account,
        };
        let plan = plan_purchase_update(&current.memo_no, &old, &new, Utc::now().date_naive());

        let purchase = sqlx::query_as::<_, PurchaseRecord>(
            r#"
            UPDATE purchases SET
                supplier_id = $2,
                purchase_date = $3,
                total_amount = $4,
                account_id = $5,
                notes = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(purchase_id)
        .bind(new.supplier_id)
        .bind(new.purchase_date)
        .bind(new.total_amount)
        .bind(new.account.id)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        ledger::apply_plan(&mut tx, &plan).await?;

        tx.commit().await?;

        tracing::info!(
            purchase_id,
            memo_no = %purchase.memo_no,
            user_id,
            adjustments = plan.transactions.len(),
            "purchase updated"
        );
        Ok(purchase)
    }
}
