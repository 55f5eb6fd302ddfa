//! Order lifecycle service
//!
//! Each transition runs in one database transaction: lock the order row,
//! ask the planner for the effects, write the header, post the plan.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    diff_items, plan_cancel, plan_checkout, plan_create, plan_delivery, plan_update, total_items,
    validate_delivery, validate_memo_no, validate_order_amounts, validate_order_lines, AccountRef,
    DeliveryRequest, OrderLine, OrderSnapshot, OrderStatus, OrderTerms,
};
use sqlx::{FromRow, PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::ledger;
use crate::services::memo::{resolve_memo_no, MemoSeries};

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Order header row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub branch_id: i64,
    pub memo_no: String,
    pub order_date: NaiveDate,
    pub customer_id: i64,
    pub salesperson_id: i64,
    pub total_payable: Decimal,
    pub advance_payment: Decimal,
    pub payment_account_id: Option<i64>,
    pub status: String,
    pub total_items: i64,
    pub items_delivered: i64,
    pub delivery_date: Option<NaiveDate>,
    pub exit_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn status(&self) -> AppResult<OrderStatus> {
        Ok(self.status.parse()?)
    }

    fn snapshot(&self, payment_account: Option<AccountRef>) -> AppResult<OrderSnapshot> {
        Ok(OrderSnapshot {
            id: self.id,
            memo_no: self.memo_no.clone(),
            terms: OrderTerms {
                branch_id: self.branch_id,
                order_date: self.order_date,
                customer_id: self.customer_id,
                salesperson_id: self.salesperson_id,
                total_payable: self.total_payable,
                advance_payment: self.advance_payment,
                payment_account,
                total_items: self.total_items,
            },
            status: self.status()?,
            items_delivered: self.items_delivered,
        })
    }
}

/// Order item row
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderItemRecord {
    pub id: i64,
    pub branch_id: i64,
    pub memo_no: String,
    pub product_id: i64,
    pub quantity: i64,
    pub subtotal: Decimal,
}

impl OrderItemRecord {
    fn line(&self) -> OrderLine {
        OrderLine {
            product_id: self.product_id,
            quantity: self.quantity,
            subtotal: self.subtotal,
        }
    }
}

/// Order with its items
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderRecord,
    pub items: Vec<OrderItemRecord>,
}

/// One requested order line
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderItemInput {
    #[validate(range(min = 1))]
    pub product_id: i64,
    pub quantity: i64,
    pub subtotal: Decimal,
}

/// Input for creating or editing an order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrderInput {
    pub memo_no: Option<String>,
    pub order_date: NaiveDate,
    #[validate(range(min = 1))]
    pub customer_id: i64,
    #[validate(range(min = 1))]
    pub salesperson_id: i64,
    pub total_payable: Decimal,
    #[serde(default)]
    pub advance_payment: Decimal,
    pub payment_account_id: Option<i64>,
    pub delivery_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    #[validate]
    pub items: Vec<OrderItemInput>,
}

impl OrderInput {
    /// Field checks followed by the domain rules
    fn check(&self) -> AppResult<()> {
        self.validate()?;
        if let Some(memo_no) = &self.memo_no {
            validate_memo_no(memo_no)?;
        }
        validate_order_lines(&self.lines())?;
        validate_order_amounts(
            self.total_payable,
            self.advance_payment,
            self.payment_account_id,
        )?;
        Ok(())
    }

    fn lines(&self) -> Vec<OrderLine> {
        self.items
            .iter()
            .map(|item| OrderLine {
                product_id: item.product_id,
                quantity: item.quantity,
                subtotal: item.subtotal,
            })
            .collect()
    }

    fn terms(&self, branch_id: i64, payment_account: Option<AccountRef>) -> OrderTerms {
        OrderTerms {
            branch_id,
            order_date: self.order_date,
            customer_id: self.customer_id,
            salesperson_id: self.salesperson_id,
            total_payable: self.total_payable,
            advance_payment: self.advance_payment,
            payment_account,
            total_items: total_items(&self.lines()),
        }
    }
}

/// Input for confirming a (partial) delivery
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeliveryInput {
    #[serde(default)]
    pub items: i64,
    #[serde(default)]
    pub paid: Decimal,
    pub payment_account_id: Option<i64>,
    pub exit_date: Option<NaiveDate>,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Lock an order row of the branch for the rest of the transaction
async fn lock_order(conn: &mut PgConnection, branch_id: i64, order_id: i64) -> AppResult<OrderRecord> {
    sqlx::query_as::<_, OrderRecord>(
        "SELECT * FROM orders WHERE id = $1 AND branch_id = $2 FOR UPDATE",
    )
    .bind(order_id)
    .bind(branch_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Order".to_string()))
}

/// The locked order as the planner sees it
async fn load_snapshot(
    conn: &mut PgConnection,
    branch_id: i64,
    order_id: i64,
) -> AppResult<OrderSnapshot> {
    let order = lock_order(conn, branch_id, order_id).await?;
    let account = ledger::optional_account_ref(conn, branch_id, order.payment_account_id).await?;
    order.snapshot(account)
}

async fn fetch_items(
    conn: &mut PgConnection,
    branch_id: i64,
    memo_no: &str,
) -> AppResult<Vec<OrderItemRecord>> {
    let items = sqlx::query_as::<_, OrderItemRecord>(
        r#"
        SELECT * FROM order_items
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

async fn insert_item(
    conn: &mut PgConnection,
    branch_id: i64,
    memo_no: &str,
    line: &OrderLine,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (branch_id, memo_no, product_id, quantity, subtotal)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(branch_id)
    .bind(memo_no)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.subtotal)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Write a new status; the transition itself was checked by the planner
async fn set_status(conn: &mut PgConnection, order_id: i64, status: OrderStatus) -> AppResult<OrderRecord> {
    let order = sqlx::query_as::<_, OrderRecord>(
        r#"
        UPDATE orders SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(order_id)
    .bind(status.as_str())
    .fetch_one(&mut *conn)
    .await?;
    Ok(order)
}

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a pending order
    pub async fn create(&self, branch_id: i64, user_id: i64, input: OrderInput) -> AppResult<OrderWithItems> {
        input.check()?;
        let memo_no =
            resolve_memo_no(&self.db, MemoSeries::Orders, branch_id, input.memo_no.clone()).await;
        let lines = input.lines();

        let mut tx = self.db.begin().await?;

        let account =
            ledger::optional_account_ref(&mut tx, branch_id, input.payment_account_id).await?;
        let terms = input.terms(branch_id, account);
        let plan = plan_create(&memo_no, &terms)?;

        let order = sqlx::query_as::<_, OrderRecord>(
            r#"
            INSERT INTO orders (
                branch_id, memo_no, order_date, customer_id, salesperson_id,
                total_payable, advance_payment, payment_account_id, status,
                total_items, items_delivered, delivery_date, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(branch_id)
        .bind(&memo_no)
        .bind(terms.order_date)
        .bind(terms.customer_id)
        .bind(terms.salesperson_id)
        .bind(terms.total_payable)
        .bind(terms.advance_payment)
        .bind(input.payment_account_id)
        .bind(OrderStatus::Pending.as_str())
        .bind(terms.total_items)
        .bind(input.delivery_date)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from(e).on_duplicate("memo_no"))?;

        for line in &lines {
            insert_item(&mut tx, branch_id, &memo_no, line).await?;
        }
        ledger::apply_plan(&mut tx, &plan).await?;
        let items = fetch_items(&mut tx, branch_id, &memo_no).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            memo_no = %order.memo_no,
            branch_id,
            user_id,
            total_items = order.total_items,
            "order created"
        );
        Ok(OrderWithItems { order, items })
    }

    /// Edit a pending order and post the difference of its footprint
    pub async fn update(
        &self,
        branch_id: i64,
        order_id: i64,
        user_id: i64,
        input: OrderInput,
    ) -> AppResult<OrderWithItems> {
        input.check()?;
        let lines = input.lines();

        let mut tx = self.db.begin().await?;

        let snapshot = load_snapshot(&mut tx, branch_id, order_id).await?;
        let account =
            ledger::optional_account_ref(&mut tx, branch_id, input.payment_account_id).await?;
        let new_terms = input.terms(branch_id, account);
        let plan = plan_update(&snapshot, &new_terms, today())?;

        let current: Vec<OrderLine> = fetch_items(&mut tx, branch_id, &snapshot.memo_no)
            .await?
            .iter()
            .map(OrderItemRecord::line)
            .collect();
        let diff = diff_items(&current, &lines);

        for line in &diff.inserts {
            insert_item(&mut tx, branch_id, &snapshot.memo_no, line).await?;
        }
        for line in &diff.updates {
            sqlx::query(
                r#"
                UPDATE order_items SET quantity = $4, subtotal = $5
                WHERE branch_id = $1 AND memo_no = $2 AND product_id = $3
                "#,
            )
            .bind(branch_id)
            .bind(&snapshot.memo_no)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.subtotal)
            .execute(&mut *tx)
            .await?;
        }
        if !diff.deletes.is_empty() {
            sqlx::query(
                r#"
                DELETE FROM order_items
                WHERE branch_id = $1 AND memo_no = $2 AND product_id = ANY($3)
                "#,
            )
            .bind(branch_id)
            .bind(&snapshot.memo_no)
            .bind(&diff.deletes)
            .execute(&mut *tx)
            .await?;
        }

        let order = sqlx::query_as::<_, OrderRecord>(
            r#"
            UPDATE orders SET
                order_date = $2,
                customer_id = $3,
                salesperson_id = $4,
                total_payable = $5,
                advance_payment = $6,
                payment_account_id = $7,
                total_items = $8,
                delivery_date = $9,
                notes = $10,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(new_terms.order_date)
        .bind(new_terms.customer_id)
        .bind(new_terms.salesperson_id)
        .bind(new_terms.total_payable)
        .bind(new_terms.advance_payment)
        .bind(input.payment_account_id)
        .bind(new_terms.total_items)
        .bind(input.delivery_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        ledger::apply_plan(&mut tx, &plan).await?;
        let items = fetch_items(&mut tx, branch_id, &order.memo_no).await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            memo_no = %order.memo_no,
            user_id,
            items_changed = !diff.is_empty(),
            adjustments = plan.transactions.len(),
            "order updated"
        );
        Ok(OrderWithItems { order, items })
    }

    /// Move a pending order to checkout
    pub async fn checkout(&self, branch_id: i64, order_id: i64, user_id: i64) -> AppResult<OrderRecord> {
        let mut tx = self.db.begin().await?;

        let snapshot = load_snapshot(&mut tx, branch_id, order_id).await?;
        let (status, plan) = plan_checkout(&snapshot, today())?;
        let order = set_status(&mut tx, order_id, status).await?;
        ledger::apply_plan(&mut tx, &plan).await?;

        tx.commit().await?;

        tracing::info!(order_id, memo_no = %order.memo_no, user_id, "order checked out");
        Ok(order)
    }

    /// Hand over items and/or collect a payment
    pub async fn deliver(
        &self,
        branch_id: i64,
        order_id: i64,
        user_id: i64,
        input: DeliveryInput,
    ) -> AppResult<OrderRecord> {
        input.validate()?;
        validate_delivery(input.items, input.paid, input.payment_account_id)?;

        let mut tx = self.db.begin().await?;

        let snapshot = load_snapshot(&mut tx, branch_id, order_id).await?;
        let account =
            ledger::optional_account_ref(&mut tx, branch_id, input.payment_account_id).await?;
        let request = DeliveryRequest {
            items: input.items,
            paid: input.paid,
            account,
            exit_date: input.exit_date.unwrap_or_else(today),
        };
        let outcome = plan_delivery(&snapshot, &request)?;

        let order = sqlx::query_as::<_, OrderRecord>(
            r#"
            UPDATE orders SET
                status = $2,
                items_delivered = $3,
                advance_payment = $4,
                payment_account_id = $5,
                exit_date = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(outcome.status.as_str())
        .bind(outcome.items_delivered)
        .bind(outcome.advance_payment)
        .bind(outcome.payment_account.map(|a| a.id))
        .bind(request.exit_date)
        .fetch_one(&mut *tx)
        .await?;

        ledger::apply_plan(&mut tx, &outcome.plan).await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            memo_no = %order.memo_no,
            user_id,
            delivered = outcome.delivered_now,
            items_delivered = outcome.items_delivered,
            paid = %request.paid,
            "order delivery confirmed"
        );
        Ok(order)
    }

    /// Cancel an order that is not fully delivered
    pub async fn cancel(&self, branch_id: i64, order_id: i64, user_id: i64) -> AppResult<OrderRecord> {
        let mut tx = self.db.begin().await?;

        let snapshot = load_snapshot(&mut tx, branch_id, order_id).await?;
        let (status, plan) = plan_cancel(&snapshot, today())?;
        let order = set_status(&mut tx, order_id, status).await?;
        ledger::apply_plan(&mut tx, &plan).await?;

        tx.commit().await?;

        tracing::info!(
            order_id,
            memo_no = %order.memo_no,
            user_id,
            refunded = !plan.transactions.is_empty(),
            "order cancelled"
        );
        Ok(order)
    }

    /// Get an order with its items
    pub async fn get(&self, branch_id: i64, order_id: i64) -> AppResult<OrderWithItems> {
        let mut conn = self.db.acquire().await?;

        let order = sqlx::query_as::<_, OrderRecord>(
            "SELECT * FROM orders WHERE id = $1 AND branch_id = $2",
        )
        .bind(order_id)
        .bind(branch_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        let items = fetch_items(&mut conn, branch_id, &order.memo_no).await?;

        Ok(OrderWithItems { order, items })
    }

    /// List the branch's orders, optionally filtered by status
    pub async fn list(&self, branch_id: i64, status: Option<OrderStatus>) -> AppResult<Vec<OrderRecord>> {
        let orders = sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT * FROM orders
            WHERE branch_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY order_date DESC, id DESC
            "#,
        )
        .bind(branch_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;
        Ok(orders)
    }

    /// Items of an order by memo number
    pub async fn items_by_memo(&self, branch_id: i64, memo_no: &str) -> AppResult<Vec<OrderItemRecord>> {
        let mut conn = self.db.acquire().await?;
        fetch_items(&mut conn, branch_id, memo_no).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::AccountKind;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn input(advance: &str, account: Option<i64>) -> OrderInput {
        OrderInput {
            memo_no: None,
            order_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            customer_id: 7,
            salesperson_id: 3,
            total_payable: dec("1000"),
            advance_payment: dec(advance),
            payment_account_id: account,
            delivery_date: None,
            notes: None,
            items: vec![
                OrderItemInput {
                    product_id: 1,
                    quantity: 2,
                    subtotal: dec("400"),
                },
                OrderItemInput {
                    product_id: 2,
                    quantity: 1,
                    subtotal: dec("600"),
                },
            ],
        }
    }

    fn record(status: &str) -> OrderRecord {
        let now = Utc::now();
        OrderRecord {
            id: 9,
            branch_id: 1,
            memo_no: "000009".to_string(),
            order_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            customer_id: 7,
            salesperson_id: 3,
            total_payable: dec("1000"),
            advance_payment: dec("200"),
            payment_account_id: Some(10),
            status: status.to_string(),
            total_items: 3,
            items_delivered: 0,
            delivery_date: None,
            exit_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(input("200", Some(10)).check().is_ok());
        assert!(input("0", None).check().is_ok());
    }

    #[test]
    fn test_advance_without_account_is_rejected() {
        let err = input("200", None).check().unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field, "payment_account_id"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_and_duplicate_items_are_rejected() {
        let mut empty = input("0", None);
        empty.items.clear();
        assert!(empty.check().is_err());

        let mut duplicate = input("0", None);
        duplicate.items[1].product_id = 1;
        assert!(duplicate.check().is_err());
    }

    #[test]
    fn test_bad_memo_is_rejected() {
        let mut bad = input("0", None);
        bad.memo_no = Some("memo no 1".to_string());
        assert!(bad.check().is_err());
    }

    #[test]
    fn test_terms_count_items() {
        let terms = input("200", Some(10)).terms(1, Some(AccountRef::new(10, AccountKind::Cash)));
        assert_eq!(terms.total_items, 3);
        assert_eq!(terms.due(), dec("800"));
    }

    #[test]
    fn test_snapshot_parses_status() {
        let account = Some(AccountRef::new(10, AccountKind::Cash));
        let snapshot = record("checkout").snapshot(account).unwrap();
        assert_eq!(snapshot.status, OrderStatus::Checkout);
        assert_eq!(snapshot.terms.payment_account, account);
        assert_eq!(snapshot.progress().remaining(), 3);

        assert!(record("archived").snapshot(account).is_err());
    }
}
