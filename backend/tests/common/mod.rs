//! In-memory books that accumulate effect plans the way the database does

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use shared::{
    EffectPlan, EntityType, NewTransaction, ProgressDelta, ProgressKey, TopSheetDelta,
    TopSheetKey,
};
use std::collections::BTreeMap;
use std::str::FromStr;

// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// Every aggregate the engine writes, with additive semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Books {
    pub accounts: BTreeMap<i64, Decimal>,
    pub dues: BTreeMap<i64, Decimal>,
    pub stock: BTreeMap<i64, i64>,
    pub top_sheets: BTreeMap<TopSheetKey, TopSheetDelta>,
    pub progress: BTreeMap<ProgressKey, ProgressDelta>,
    pub ledger: Vec<NewTransaction>,
}

impl Books {
    pub fn post(&mut self, plan: &EffectPlan) {
        for (id, amount) in &plan.accounts {
            *self.accounts.entry(*id).or_default() += *amount;
        }
        for (id, amount) in &plan.customers {
            *self.dues.entry(*id).or_default() += *amount;
        }
        for (id, quantity) in &plan.stock {
            *self.stock.entry(*id).or_default() += *quantity;
        }
        for (key, delta) in &plan.top_sheets {
            *self.top_sheets.entry(*key).or_default() += *delta;
        }
        for (key, delta) in &plan.progress {
            *self.progress.entry(*key).or_default() += *delta;
        }
        self.ledger.extend(plan.transactions.iter().cloned());
    }

    pub fn account(&self, id: i64) -> Decimal {
        self.accounts.get(&id).copied().unwrap_or_default()
    }

    pub fn total_balance(&self) -> Decimal {
        self.accounts.values().copied().sum()
    }

    pub fn due(&self, customer_id: i64) -> Decimal {
        self.dues.get(&customer_id).copied().unwrap_or_default()
    }

    pub fn total_due(&self) -> Decimal {
        self.dues.values().copied().sum()
    }

    pub fn stock_of(&self, product_id: i64) -> i64 {
        self.stock.get(&product_id).copied().unwrap_or_default()
    }

    /// Top sheet columns summed over every date of a branch
    pub fn sheet_total(&self, branch_id: i64) -> TopSheetDelta {
        self.top_sheets
            .iter()
            .filter(|(key, _)| key.branch_id == branch_id)
            .fold(TopSheetDelta::default(), |acc, (_, delta)| acc + *delta)
    }

    /// Progress columns summed over every date of an employee
    pub fn progress_total(&self, employee_id: i64) -> ProgressDelta {
        self.progress
            .iter()
            .filter(|(key, _)| key.employee_id == employee_id)
            .fold(ProgressDelta::default(), |acc, (_, delta)| acc + *delta)
    }

    /// Net money the ledger says went into `account_id`
    pub fn ledger_net(&self, account_id: i64) -> Decimal {
        self.ledger.iter().fold(Decimal::ZERO, |acc, entry| {
            let mut acc = acc;
            if entry.to.entity == EntityType::Accounts && entry.to.id == account_id {
                acc += entry.amount;
            }
            if entry.from.entity == EntityType::Accounts && entry.from.id == account_id {
                acc -= entry.amount;
            }
            acc
        })
    }

    /// The books without the ledger, for comparing aggregate state only
    pub fn aggregates(&self) -> Books {
        let mut books = Books {
            ledger: Vec::new(),
            ..self.clone()
        };
        books.accounts.retain(|_, v| !v.is_zero());
        books.dues.retain(|_, v| !v.is_zero());
        books.stock.retain(|_, v| *v != 0);
        books.top_sheets.retain(|_, v| !v.is_zero());
        books.progress.retain(|_, v| !v.is_zero());
        books
    }
}
