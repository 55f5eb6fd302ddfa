//! Branch money accounts

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

/// Account service
#[derive(Clone)]
pub struct AccountService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccountRecord {
    pub id: i64,
    pub branch_id: i64,
    pub name: String,
    pub kind: String,
    pub current_balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl AccountService {
    /// Create a new AccountService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All accounts of a branch
    pub async fn list(&self, branch_id: i64) -> AppResult<Vec<AccountRecord>> {
        let accounts = sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT id, branch_id, name, kind, current_balance, updated_at
            FROM accounts
            WHERE branch_id = $1
            ORDER BY kind, name
            "#,
        )
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;
        Ok(accounts)
    }
}
