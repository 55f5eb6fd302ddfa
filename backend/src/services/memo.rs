//! Memo number assignment for orders, sales and purchases

use shared::{random_memo, sequential_memo};
use sqlx::PgPool;

/// Which header table a memo number belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoSeries {
    Orders,
    Sales,
    Purchases,
}

impl MemoSeries {
    fn count_sql(&self) -> &'static str {
        match self {
            MemoSeries::Orders => "SELECT COUNT(*) FROM orders WHERE branch_id = $1",
            MemoSeries::Sales => "SELECT COUNT(*) FROM sales_history WHERE branch_id = $1",
            MemoSeries::Purchases => "SELECT COUNT(*) FROM purchases WHERE branch_id = $1",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MemoSeries::Orders => "orders",
            MemoSeries::Sales => "sales",
            MemoSeries::Purchases => "purchases",
        }
    }
}

/// Next memo number for a branch.
///
/// Runs on the pool, outside the caller's transaction, so a failing count
/// cannot abort it. Falls back to a random memo.
pub async fn next_memo_no(db: &PgPool, series: MemoSeries, branch_id: i64) -> String {
    match sqlx::query_scalar::<_, i64>(series.count_sql())
        .bind(branch_id)
        .fetch_one(db)
        .await
    {
        Ok(count) => sequential_memo(count),
        Err(e) => {
            tracing::warn!(
                error = %e,
                series = series.name(),
                branch_id,
                "memo count failed, using random memo"
            );
            random_memo()
        }
    }
}

/// The caller's memo when given, otherwise the next one in the series
pub async fn resolve_memo_no(
    db: &PgPool,
    series: MemoSeries,
    branch_id: i64,
    requested: Option<String>,
) -> String {
    match requested {
        Some(memo_no) => memo_no,
        None => next_memo_no(db, series, branch_id).await,
    }
}
