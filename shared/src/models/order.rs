//! Order models and the order lifecycle state machine

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AccountRef, UnknownVariant};

/// Order lifecycle states
///
/// `pending` → `checkout` → `delivery`, or → `cancelled` from any state
/// where delivery is not yet complete. A partial delivery is not a stored
/// state; see [`DeliveryProgress::is_partial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Checkout,
    Delivery,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Checkout => "checkout",
            OrderStatus::Delivery => "delivery",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Resolve the state an order moves to when `action` is applied.
    pub fn next(
        self,
        action: OrderAction,
        progress: DeliveryProgress,
    ) -> Result<OrderStatus, TransitionError> {
        match (self, action) {
            (OrderStatus::Pending, OrderAction::Update) => Ok(OrderStatus::Pending),
            (OrderStatus::Pending, OrderAction::Checkout) => Ok(OrderStatus::Checkout),
            (OrderStatus::Pending | OrderStatus::Checkout, OrderAction::Cancel) => {
                Ok(OrderStatus::Cancelled)
            }
            (OrderStatus::Checkout, OrderAction::Deliver) => Ok(OrderStatus::Delivery),
            (OrderStatus::Delivery, OrderAction::Deliver | OrderAction::Cancel)
                if progress.is_complete() =>
            {
                Err(TransitionError::FullyDelivered { action })
            }
            (OrderStatus::Delivery, OrderAction::Deliver) => Ok(OrderStatus::Delivery),
            (OrderStatus::Delivery, OrderAction::Cancel) => Ok(OrderStatus::Cancelled),
            (from, action) => Err(TransitionError::Illegal { from, action }),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "checkout" => Ok(OrderStatus::Checkout),
            "delivery" => Ok(OrderStatus::Delivery),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownVariant::new("order status", other)),
        }
    }
}

/// Operations that move an order through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Update,
    Checkout,
    Deliver,
    Cancel,
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verb = match self {
            OrderAction::Update => "update",
            OrderAction::Checkout => "checkout",
            OrderAction::Deliver => "deliver",
            OrderAction::Cancel => "cancel",
        };
        f.write_str(verb)
    }
}

/// Illegal lifecycle moves
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} an order in '{from}' state")]
    Illegal {
        from: OrderStatus,
        action: OrderAction,
    },
    #[error("cannot {action} an order that is fully delivered")]
    FullyDelivered { action: OrderAction },
    #[error("delivery must hand over items or collect a payment")]
    EmptyDelivery,
}

/// Item counts that decide whether a delivered order is partial or complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryProgress {
    pub total_items: i64,
    pub items_delivered: i64,
}

impl DeliveryProgress {
    pub fn new(total_items: i64, items_delivered: i64) -> Self {
        Self {
            total_items,
            items_delivered,
        }
    }

    pub fn remaining(&self) -> i64 {
        (self.total_items - self.items_delivered).max(0)
    }

    pub fn is_complete(&self) -> bool {
        self.items_delivered >= self.total_items
    }

    pub fn is_partial(&self) -> bool {
        self.items_delivered > 0 && !self.is_complete()
    }
}

/// One product line of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
    pub subtotal: Decimal,
}

/// The money and ownership terms of an order; everything the pending
/// footprint depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerms {
    pub branch_id: i64,
    pub order_date: NaiveDate,
    pub customer_id: i64,
    pub salesperson_id: i64,
    pub total_payable: Decimal,
    pub advance_payment: Decimal,
    pub payment_account: Option<AccountRef>,
    pub total_items: i64,
}

impl OrderTerms {
    /// What the customer still owes on this order
    pub fn due(&self) -> Decimal {
        (self.total_payable - self.advance_payment).max(Decimal::ZERO)
    }
}

/// The current persisted state of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: i64,
    pub memo_no: String,
    pub terms: OrderTerms,
    pub status: OrderStatus,
    pub items_delivered: i64,
}

impl OrderSnapshot {
    pub fn progress(&self) -> DeliveryProgress {
        DeliveryProgress::new(self.terms.total_items, self.items_delivered)
    }
}

/// Sum of line quantities
pub fn total_items(lines: &[OrderLine]) -> i64 {
    lines.iter().map(|l| l.quantity).sum()
}

/// Row-level changes that bring the stored item set in line with an edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDiff {
    pub inserts: Vec<OrderLine>,
    pub updates: Vec<OrderLine>,
    pub deletes: Vec<i64>,
}

impl ItemDiff {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Diff two item sets by product id.
pub fn diff_items(old: &[OrderLine], new: &[OrderLine]) -> ItemDiff {
    let before: BTreeMap<i64, &OrderLine> = old.iter().map(|l| (l.product_id, l)).collect();
    let after: BTreeMap<i64, &OrderLine> = new.iter().map(|l| (l.product_id, l)).collect();

    let mut diff = ItemDiff::default();
    for (product_id, line) in &after {
        match before.get(product_id) {
            None => diff.inserts.push(**line),
            Some(prev) if *prev != *line => diff.updates.push(**line),
            Some(_) => {}
        }
    }
    diff.deletes = before
        .keys()
        .filter(|id| !after.contains_key(id))
        .copied()
        .collect();
    diff
}
