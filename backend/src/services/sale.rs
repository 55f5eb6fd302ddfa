//! Retail sale service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    plan_sale_create, plan_sale_update, validate_memo_no, validate_order_amounts,
    validate_sale_lines, AccountRef, Sale, SaleLine, SaleTerms,
};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::services::memo::{resolve_memo_no, MemoSeries};

/// Sale service
#[derive(Clone)]
pub struct SaleService {
    db: PgPool,
}

/// Sale header row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleRecord {
    pub id: i64,
    pub branch_id: i64,
    pub memo_no: String,
    pub sale_date: NaiveDate,
    pub customer_id: i64,
    pub salesperson_id: i64,
    pub payment_account_id: Option<i64>,
    pub total_payable: Decimal,
    pub paid_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sold item row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SoldItemRecord {
    pub id: i64,
    pub branch_id: i64,
    pub memo_no: String,
    pub product_id: i64,
    pub quantity: i64,
    pub total_price: Decimal,
}

/// Sale with its sold items
#[derive(Debug, Clone, Serialize)]
pub struct SaleWithItems {
    #[serde(flatten)]
    pub sale: SaleRecord,
    pub items: Vec<SoldItemRecord>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaleItemInput {
    #[validate(range(min = 1))]
    pub product_id: i64,
    pub quantity: i64,
    pub total_price: Decimal,
}

/// Input for recording or rewriting a sale
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaleInput {
    pub memo_no: Option<String>,
    pub sale_date: NaiveDate,
    #[validate(range(min = 1))]
    pub customer_id: i64,
    #[validate(range(min = 1))]
    pub salesperson_id: i64,
    pub payment_account_id: Option<i64>,
    pub total_payable: Decimal,
    #[serde(default)]
    pub paid_amount: Decimal,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate]
    pub items: Vec<SaleItemInput>,
}

impl SaleInput {
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(memo_no) = &self.memo_no {
            validate_memo_no(memo_no)?;
        }
        validate_sale_lines(&self.lines())?;
        validate_order_amounts(self.total_payable, self.paid_amount, self.payment_account_id)?;
        Ok(())
    }

    fn lines(&self) -> Vec<SaleLine> {
        self.items
            .iter()
            .map(|item| SaleLine {
                product_id: item.product_id,
                quantity: item.quantity,
                total_price: item.total_price,
            })
            .collect()
    }

    fn sale(&self, branch_id: i64, memo_no: &str, payment_account: Option<AccountRef>) -> Sale {
        Sale {
            memo_no: memo_no.to_string(),
            terms: SaleTerms {
                branch_id,
                sale_date: self.sale_date,
                customer_id: self.customer_id,
                salesperson_id: self.salesperson_id,
                payment_account,
                total_payable: self.total_payable,
                paid_amount: self.paid_amount,
            },
            lines: self.lines(),
        }
    }
}

async fn fetch_items(
    conn: &mut PgConnection,
    branch_id: i64,
    memo_no: &str,
) -> AppResult<Vec<SoldItemRecord>> {
    let items = sqlx::query_as::<_, SoldItemRecord>(
        r#"
        SELECT * FROM sold_items_history
        WHERE branch_id = $1 AND memo_no = $2
        ORDER BY product_id
        "#,
    )
    .bind(branch_id)
    .bind(memo_no)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}

async fn insert_items(
    conn: &mut PgConnection,
    branch_id: i64,
    memo_no: &str,
    lines: &[SaleLine],
) -> AppResult<()> {
    for line in lines {
        sqlx::query(
            r#"
            INSERT INTO sold_items_history (branch_id, memo_no, product_id, quantity, total_price)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(branch_id)
        .bind(memo_no)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.total_price)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Lock a stored sale and rebuild it as the planner sees it
async fn load_sale(conn: &mut PgConnection, branch_id: i64, memo_no: &str) -> AppResult<Sale> {
    let record = sqlx::query_as::<_, SaleRecord>(
        "SELECT * FROM sales_history WHERE branch_id = $1 AND memo_no = $2 FOR UPDATE",
    )
    .bind(branch_id)
    .bind(memo_no)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;

    let payment_account =
        ledger::optional_account_ref(conn, branch_id, record.payment_account_id).await?;
    let lines = fetch_items(conn, branch_id, memo_no)
        .await?
        .into_iter()
        .map(|item| SaleLine {
            product_id: item.product_id,
            quantity: item.quantity,
            total_price: item.total_price,
        })
        .collect();

    Ok(Sale {
        memo_no: record.memo_no,
        terms: SaleTerms {
            branch_id: record.branch_id,
            sale_date: record.sale_date,
            customer_id: record.customer_id,
            salesperson_id: record.salesperson_id,
            payment_account,
            total_payable: record.total_payable,
            paid_amount: record.paid_amount,
        },
        lines,
    })
}

impl SaleService {
    /// Create a new SaleService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale and apply its effects
    pub async fn create(&self, branch_id: i64, user_id: i64, input: SaleInput) -> AppResult<SaleWithItems> {
        input.check()?;
        let memo_no =
            resolve_memo_no(&self.db, MemoSeries::Sales, branch_id, input.memo_no.clone()).await;

        let mut tx = self.db.begin().await?;

        let account =
            ledger::optional_account_ref(&mut tx, branch_id, input.payment_account_id).await?;
        let sale = input.sale(branch_id, &memo_no, account);
        let plan = plan_sale_create(&sale)?;

        let record = sqlx::query_as::<_, SaleRecord>(
            r#"
            INSERT INTO sales_history (
                branch_id, memo_no, sale_date, customer_id, salesperson_id,
                payment_account_id, total_payable, paid_amount, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(branch_id)
        .bind(&memo_no)
        .bind(input.sale_date)
        .bind(input.customer_id)
        .bind(input.salesperson_id)
        .bind(input.payment_account_id)
        .bind(input.total_payable)
        .bind(input.paid_amount)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from(e).on_duplicate("memo_no"))?;

        insert_items(&mut tx, branch_id, &memo_no, &sale.lines).await?;
        ledger::apply_plan(&mut tx, &plan).await?;
        let items = fetch_items(&mut tx, branch_id, &memo_no).await?;

        tx.commit().await?;

        tracing::info!(
            sale_id = record.id,
            memo_no = %record.memo_no,
            branch_id,
            user_id,
            items = sale.item_count(),
            "sale recorded"
        );
        Ok(SaleWithItems { sale: record, items })
    }

    /// Rewrite a sale: reverse the stored effects, then apply the new ones
    pub async fn update(
        &self,
        branch_id: i64,
        memo_no: &str,
        user_id: i64,
        input: SaleInput,
    ) -> AppResult<SaleWithItems> {
        input.check()?;

        let mut tx = self.db.begin().await?;

        let old = load_sale(&mut tx, branch_id, memo_no).await?;
        let account =
            ledger::optional_account_ref(&mut tx, branch_id, input.payment_account_id).await?;
        let new = input.sale(branch_id, memo_no, account);
        let plan = plan_sale_update(&old, &new, Utc::now().date_naive())?;

        sqlx::query("DELETE FROM sold_items_history WHERE branch_id = $1 AND memo_no = $2")
            .bind(branch_id)
            .bind(memo_no)
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, SaleRecord>(
            r#"
            UPDATE sales_history SET
                sale_date = $3,
                customer_id = $4,
                salesperson_id = $5,
                payment_account_id = $6,
                total_payable = $7,
                paid_amount = $8,
                notes = $9,
                updated_at = NOW()
            WHERE branch_id = $1 AND memo_no = $2
            RETURNING *
            "#,
        )
        .bind(branch_id)
        .bind(memo_no)
        .bind(input.sale_date)
        .bind(input.customer_id)
        .bind(input.salesperson_id)
        .bind(input.payment_account_id)
        .bind(input.total_payable)
        .bind(input.paid_amount)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        insert_items(&mut tx, branch_id, memo_no, &new.lines).await?;
        ledger::apply_plan(&mut tx, &plan).await?;
        let items = fetch_items(&mut tx, branch_id, memo_no).await?;

        tx.commit().await?;

        tracing::info!(
            sale_id = record.id,
            memo_no,
            user_id,
            unchanged = plan.is_empty(),
            "sale updated"
        );
        Ok(SaleWithItems { sale: record, items })
    }

    /// Get a sale with its sold items
    pub async fn get(&self, branch_id: i64, memo_no: &str) -> AppResult<SaleWithItems> {
        let mut conn = self.db.acquire().await?;

        let sale = sqlx::query_as::<_, SaleRecord>(
            "SELECT * FROM sales_history WHERE branch_id = $1 AND memo_no = $2",
        )
        .bind(branch_id)
        .bind(memo_no)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))?;
        let items = fetch_items(&mut conn, branch_id, memo_no).await?;

        Ok(SaleWithItems { sale, items })
    }
}
