//! Balance-bearing entities and the money-movement ledger

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of a money account; decides whether a movement lands in the
/// top sheet's `cash` or `bank` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Cash,
    Bank,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Cash => "cash",
            AccountKind::Bank => "bank",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(AccountKind::Cash),
            "bank" => Ok(AccountKind::Bank),
            other => Err(UnknownVariant::new("account kind", other)),
        }
    }
}

/// An account id together with its resolved kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef {
    pub id: i64,
    pub kind: AccountKind,
}

impl AccountRef {
    pub fn new(id: i64, kind: AccountKind) -> Self {
        Self { id, kind }
    }
}

/// Party types that can appear on either side of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Accounts,
    Customers,
    Employees,
    Suppliers,
    Branches,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Accounts => "accounts",
            EntityType::Customers => "customers",
            EntityType::Employees => "employees",
            EntityType::Suppliers => "suppliers",
            EntityType::Branches => "branches",
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accounts" => Ok(EntityType::Accounts),
            "customers" => Ok(EntityType::Customers),
            "employees" => Ok(EntityType::Employees),
            "suppliers" => Ok(EntityType::Suppliers),
            "branches" => Ok(EntityType::Branches),
            other => Err(UnknownVariant::new("entity type", other)),
        }
    }
}

/// Ledger entry types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Payment,
    Refund,
    Adjustment,
    Salary,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "payment",
            TransactionType::Refund => "refund",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Salary => "salary",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "payment" => Ok(TransactionType::Payment),
            "refund" => Ok(TransactionType::Refund),
            "adjustment" => Ok(TransactionType::Adjustment),
            "salary" => Ok(TransactionType::Salary),
            other => Err(UnknownVariant::new("transaction type", other)),
        }
    }
}

/// One side of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub id: i64,
    pub entity: EntityType,
}

impl Party {
    pub fn account(id: i64) -> Self {
        Self { id, entity: EntityType::Accounts }
    }

    pub fn customer(id: i64) -> Self {
        Self { id, entity: EntityType::Customers }
    }

    pub fn employee(id: i64) -> Self {
        Self { id, entity: EntityType::Employees }
    }

    pub fn supplier(id: i64) -> Self {
        Self { id, entity: EntityType::Suppliers }
    }
}

/// A ledger entry that has not been written yet.
///
/// Entries are append-only: corrections are new `adjustment` entries that
/// reference the same memo number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub branch_id: i64,
    pub memo_no: String,
    pub from: Party,
    pub to: Party,
    /// Always positive; direction is carried by `from` and `to`
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub transaction_date: NaiveDate,
    pub notes: String,
}

/// Raised when a stored string does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
