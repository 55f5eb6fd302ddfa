//! Daily accumulators: the branch top sheet and per-employee progress

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg};

use super::AccountKind;

/// Signed increments for one `(branch, date)` top sheet row.
///
/// Every field is added to the stored value; nothing here is ever written
/// as an absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopSheetDelta {
    pub pending: i64,
    pub checkout: i64,
    pub delivery: i64,
    pub cancelled: i64,
    pub order_count: i64,
    pub ready_made: i64,
    pub cash: Decimal,
    pub bank: Decimal,
    pub expense: Decimal,
}

impl TopSheetDelta {
    /// A delta that only moves money into the column matching `kind`
    pub fn money(kind: AccountKind, amount: Decimal) -> Self {
        match kind {
            AccountKind::Cash => Self {
                cash: amount,
                ..Self::default()
            },
            AccountKind::Bank => Self {
                bank: amount,
                ..Self::default()
            },
        }
    }

    pub fn expense(amount: Decimal) -> Self {
        Self {
            expense: amount,
            ..Self::default()
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for TopSheetDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            pending: self.pending + rhs.pending,
            checkout: self.checkout + rhs.checkout,
            delivery: self.delivery + rhs.delivery,
            cancelled: self.cancelled + rhs.cancelled,
            order_count: self.order_count + rhs.order_count,
            ready_made: self.ready_made + rhs.ready_made,
            cash: self.cash + rhs.cash,
            bank: self.bank + rhs.bank,
            expense: self.expense + rhs.expense,
        }
    }
}

impl AddAssign for TopSheetDelta {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for TopSheetDelta {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            pending: -self.pending,
            checkout: -self.checkout,
            delivery: -self.delivery,
            cancelled: -self.cancelled,
            order_count: -self.order_count,
            ready_made: -self.ready_made,
            cash: -self.cash,
            bank: -self.bank,
            expense: -self.expense,
        }
    }
}

/// Signed increments for one `(date, employee)` progress row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressDelta {
    pub sale_amount: Decimal,
    pub sale_return_amount: Decimal,
    pub order_count: i64,
    pub item_count: i64,
    pub production_units: i64,
    pub overtime_hours: i64,
    pub advance_payment: Decimal,
    pub salary: Decimal,
}

impl ProgressDelta {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for ProgressDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            sale_amount: self.sale_amount + rhs.sale_amount,
            sale_return_amount: self.sale_return_amount + rhs.sale_return_amount,
            order_count: self.order_count + rhs.order_count,
            item_count: self.item_count + rhs.item_count,
            production_units: self.production_units + rhs.production_units,
            overtime_hours: self.overtime_hours + rhs.overtime_hours,
            advance_payment: self.advance_payment + rhs.advance_payment,
            salary: self.salary + rhs.salary,
        }
    }
}

impl AddAssign for ProgressDelta {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for ProgressDelta {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            sale_amount: -self.sale_amount,
            sale_return_amount: -self.sale_return_amount,
            order_count: -self.order_count,
            item_count: -self.item_count,
            production_units: -self.production_units,
            overtime_hours: -self.overtime_hours,
            advance_payment: -self.advance_payment,
            salary: -self.salary,
        }
    }
}

/// Stored top sheet row with the derived report columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopSheet {
    pub sheet_date: NaiveDate,
    pub branch_id: i64,
    #[serde(flatten)]
    pub totals: TopSheetDelta,
}

impl TopSheet {
    /// Money collected on the day across both account kinds
    pub fn total_amount(&self) -> Decimal {
        self.totals.cash + self.totals.bank
    }

    /// Cash left after the day's expenses
    pub fn balance(&self) -> Decimal {
        self.totals.cash - self.totals.expense
    }
}
