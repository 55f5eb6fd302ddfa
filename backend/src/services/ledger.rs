//! Ledger and rollup primitives
//!
//! Every shared aggregate (account balances, customer dues, stock, top sheet
//! and progress rows) is changed only through the additive statements here.
//! All functions run on the caller's connection so they join its
//! transaction; [`apply_plan`] is the single entry point services use to
//! post an [`EffectPlan`].

use rust_decimal::Decimal;
use shared::{
    AccountKind, AccountRef, EffectPlan, NewTransaction, ProgressDelta, ProgressKey,
    TopSheetDelta, TopSheetKey,
};
use sqlx::{FromRow, PgConnection};

use crate::error::{AppError, AppResult};

#[derive(Debug, FromRow)]
struct AccountKindRow {
    id: i64,
    kind: String,
}

impl AccountKindRow {
    fn into_ref(self) -> AppResult<AccountRef> {
        let kind: AccountKind = self.kind.parse()?;
        Ok(AccountRef::new(self.id, kind))
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// Resolve an account of `branch_id` to its id and kind
pub async fn account_ref(
    conn: &mut PgConnection,
    branch_id: i64,
    account_id: i64,
) -> AppResult<AccountRef> {
    sqlx::query_as::<_, AccountKindRow>(
        "SELECT id, kind FROM accounts WHERE id = $1 AND branch_id = $2",
    )
    .bind(account_id)
    .bind(branch_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::ReferenceNotFound(format!("account {}", account_id)))?
    .into_ref()
}

/// Resolve an optional account id
pub async fn optional_account_ref(
    conn: &mut PgConnection,
    branch_id: i64,
    account_id: Option<i64>,
) -> AppResult<Option<AccountRef>> {
    match account_id {
        Some(id) => Ok(Some(account_ref(conn, branch_id, id).await?)),
        None => Ok(None),
    }
}

/// The branch's cash account (lowest id when there are several)
pub async fn branch_cash_account(conn: &mut PgConnection, branch_id: i64) -> AppResult<AccountRef> {
    sqlx::query_as::<_, AccountKindRow>(
        r#"
        SELECT id, kind FROM accounts
        WHERE branch_id = $1 AND kind = 'cash'
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(branch_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::ReferenceNotFound(format!("cash account of branch {}", branch_id)))?
    .into_ref()
}

/// The given account, or the branch cash account when none is named
pub async fn account_or_cash(
    conn: &mut PgConnection,
    branch_id: i64,
    account_id: Option<i64>,
) -> AppResult<AccountRef> {
    match account_id {
        Some(id) => account_ref(conn, branch_id, id).await,
        None => branch_cash_account(conn, branch_id).await,
    }
}

// ============================================================================
// Additive deltas
// ============================================================================

/// Add `amount` to an account's current balance
pub async fn apply_account_delta(
    conn: &mut PgConnection,
    account_id: i64,
    amount: Decimal,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE accounts
        SET current_balance = current_balance + $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(account_id)
    .bind(amount)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ReferenceNotFound(format!("account {}", account_id)));
    }
    Ok(())
}

/// Add `amount` to a customer's outstanding due
pub async fn adjust_customer_due(
    conn: &mut PgConnection,
    customer_id: i64,
    amount: Decimal,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE customers
        SET due_amount = due_amount + $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(customer_id)
    .bind(amount)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ReferenceNotFound(format!("customer {}", customer_id)));
    }
    Ok(())
}

/// Add `quantity` to a product's stock. Stock never drops below zero.
pub async fn adjust_stock(conn: &mut PgConnection, product_id: i64, quantity: i64) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity = quantity + $2, updated_at = NOW()
        WHERE id = $1 AND quantity + $2 >= 0
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(product_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Err(AppError::InsufficientInventory(format!(
            "product {} has fewer than {} units in stock",
            product_id, -quantity
        )))
    } else {
        Err(AppError::ReferenceNotFound(format!("product {}", product_id)))
    }
}

/// Add a delta to the `(branch, date)` top sheet row, creating it on first touch
pub async fn upsert_top_sheet(
    conn: &mut PgConnection,
    key: TopSheetKey,
    delta: &TopSheetDelta,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO top_sheet (
            sheet_date, branch_id, pending, checkout, delivery, cancelled,
            order_count, ready_made, cash, bank, expense
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (sheet_date, branch_id) DO UPDATE SET
            pending = top_sheet.pending + EXCLUDED.pending,
            checkout = top_sheet.checkout + EXCLUDED.checkout,
            delivery = top_sheet.delivery + EXCLUDED.delivery,
            cancelled = top_sheet.cancelled + EXCLUDED.cancelled,
            order_count = top_sheet.order_count + EXCLUDED.order_count,
            ready_made = top_sheet.ready_made + EXCLUDED.ready_made,
            cash = top_sheet.cash + EXCLUDED.cash,
            bank = top_sheet.bank + EXCLUDED.bank,
            expense = top_sheet.expense + EXCLUDED.expense,
            updated_at = NOW()
        "#,
    )
    .bind(key.date)
    .bind(key.branch_id)
    .bind(delta.pending)
    .bind(delta.checkout)
    .bind(delta.delivery)
    .bind(delta.cancelled)
    .bind(delta.order_count)
    .bind(delta.ready_made)
    .bind(delta.cash)
    .bind(delta.bank)
    .bind(delta.expense)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Add a delta to the `(date, employee)` progress row, creating it on first touch
pub async fn upsert_progress(
    conn: &mut PgConnection,
    key: ProgressKey,
    delta: &ProgressDelta,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO employees_progress (
            sheet_date, branch_id, employee_id, sale_amount, sale_return_amount,
            order_count, item_count, production_units, overtime_hours,
            advance_payment, salary
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (sheet_date, employee_id) DO UPDATE SET
            sale_amount = employees_progress.sale_amount + EXCLUDED.sale_amount,
            sale_return_amount = employees_progress.sale_return_amount + EXCLUDED.sale_return_amount,
            order_count = employees_progress.order_count + EXCLUDED.order_count,
            item_count = employees_progress.item_count + EXCLUDED.item_count,
            production_units = employees_progress.production_units + EXCLUDED.production_units,
            overtime_hours = employees_progress.overtime_hours + EXCLUDED.overtime_hours,
            advance_payment = employees_progress.advance_payment + EXCLUDED.advance_payment,
            salary = employees_progress.salary + EXCLUDED.salary,
            updated_at = NOW()
        "#,
    )
    .bind(key.date)
    .bind(key.branch_id)
    .bind(key.employee_id)
    .bind(delta.sale_amount)
    .bind(delta.sale_return_amount)
    .bind(delta.order_count)
    .bind(delta.item_count)
    .bind(delta.production_units)
    .bind(delta.overtime_hours)
    .bind(delta.advance_payment)
    .bind(delta.salary)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Append one entry to the transaction ledger
pub async fn record_transaction(conn: &mut PgConnection, entry: &NewTransaction) -> AppResult<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO transactions (
            branch_id, memo_no, from_id, from_entity, to_id, to_entity,
            amount, transaction_type, transaction_date, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        "#,
    )
    .bind(entry.branch_id)
    .bind(&entry.memo_no)
    .bind(entry.from.id)
    .bind(entry.from.entity.as_str())
    .bind(entry.to.id)
    .bind(entry.to.entity.as_str())
    .bind(entry.amount)
    .bind(entry.transaction_type.as_str())
    .bind(entry.transaction_date)
    .bind(&entry.notes)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Post a plan. Rows are touched in key order: accounts, customers, stock,
/// top sheets, progress, then ledger entries.
pub async fn apply_plan(conn: &mut PgConnection, plan: &EffectPlan) -> AppResult<()> {
    for (account_id, amount) in &plan.accounts {
        apply_account_delta(conn, *account_id, *amount).await?;
    }
    for (customer_id, amount) in &plan.customers {
        adjust_customer_due(conn, *customer_id, *amount).await?;
    }
    for (product_id, quantity) in &plan.stock {
        adjust_stock(conn, *product_id, *quantity).await?;
    }
    for (key, delta) in &plan.top_sheets {
        upsert_top_sheet(conn, *key, delta).await?;
    }
    for (key, delta) in &plan.progress {
        upsert_progress(conn, *key, delta).await?;
    }
    for entry in &plan.transactions {
        record_transaction(conn, entry).await?;
    }

    tracing::debug!(
        accounts = plan.accounts.len(),
        customers = plan.customers.len(),
        stock = plan.stock.len(),
        top_sheets = plan.top_sheets.len(),
        progress = plan.progress.len(),
        transactions = plan.transactions.len(),
        "effect plan applied"
    );
    Ok(())
}
