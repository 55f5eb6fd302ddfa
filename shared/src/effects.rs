//! Effect planning for the order and sale lifecycles
//!
//! Every lifecycle operation is turned into an [`EffectPlan`]: signed deltas
//! for account balances, customer dues, stock, top sheet rows and progress
//! rows, plus the ledger entries to append. Planning is pure; the backend
//! applies a plan inside one database transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{
    AccountRef, NewTransaction, OrderAction, OrderSnapshot, OrderStatus, OrderTerms, Party,
    ProgressDelta, PurchaseTerms, RestockLine, SalaryPayment, Sale, TopSheetDelta,
    TransactionType, TransitionError, WorkerProgress,
};

/// Key of a top sheet row
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopSheetKey {
    pub branch_id: i64,
    pub date: NaiveDate,
}

/// Key of an employee progress row. The stored row is unique on
/// `(date, employee)`; the branch rides along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProgressKey {
    pub employee_id: i64,
    pub date: NaiveDate,
    pub branch_id: i64,
}

/// Failures while planning an operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("a payment account is required when money is collected")]
    MissingPaymentAccount,
    #[error("payments before the first delivered item must go to account {held}")]
    PaymentAccountMismatch { held: i64 },
}

/// The signed deltas and ledger entries one operation posts.
///
/// Maps are ordered so that applying a plan always touches rows in the same
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectPlan {
    pub accounts: BTreeMap<i64, Decimal>,
    pub customers: BTreeMap<i64, Decimal>,
    pub stock: BTreeMap<i64, i64>,
    pub top_sheets: BTreeMap<TopSheetKey, TopSheetDelta>,
    pub progress: BTreeMap<ProgressKey, ProgressDelta>,
    pub transactions: Vec<NewTransaction>,
}

impl EffectPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credit_account(&mut self, account_id: i64, amount: Decimal) -> &mut Self {
        if !amount.is_zero() {
            *self.accounts.entry(account_id).or_default() += amount;
        }
        self
    }

    pub fn adjust_due(&mut self, customer_id: i64, amount: Decimal) -> &mut Self {
        if !amount.is_zero() {
            *self.customers.entry(customer_id).or_default() += amount;
        }
        self
    }

    pub fn adjust_stock(&mut self, product_id: i64, quantity: i64) -> &mut Self {
        if quantity != 0 {
            *self.stock.entry(product_id).or_default() += quantity;
        }
        self
    }

    pub fn top_sheet(&mut self, branch_id: i64, date: NaiveDate, delta: TopSheetDelta) -> &mut Self {
        if !delta.is_zero() {
            *self
                .top_sheets
                .entry(TopSheetKey { branch_id, date })
                .or_default() += delta;
        }
        self
    }

    pub fn progress(
        &mut self,
        branch_id: i64,
        date: NaiveDate,
        employee_id: i64,
        delta: ProgressDelta,
    ) -> &mut Self {
        if !delta.is_zero() {
            *self
                .progress
                .entry(ProgressKey {
                    employee_id,
                    date,
                    branch_id,
                })
                .or_default() += delta;
        }
        self
    }

    pub fn record(&mut self, entry: NewTransaction) -> &mut Self {
        self.transactions.push(entry);
        self
    }

    /// Fold another plan into this one.
    pub fn merge(&mut self, other: EffectPlan) -> &mut Self {
        for (id, amount) in other.accounts {
            self.credit_account(id, amount);
        }
        for (id, amount) in other.customers {
            self.adjust_due(id, amount);
        }
        for (id, quantity) in other.stock {
            self.adjust_stock(id, quantity);
        }
        for (key, delta) in other.top_sheets {
            self.top_sheet(key.branch_id, key.date, delta);
        }
        for (key, delta) in other.progress {
            self.progress(key.branch_id, key.date, key.employee_id, delta);
        }
        self.transactions.extend(other.transactions);
        self.prune()
    }

    /// The negated deltas. Ledger entries are never reversed by negation,
    /// so they are dropped.
    pub fn reversed(&self) -> EffectPlan {
        EffectPlan {
            accounts: self.accounts.iter().map(|(k, v)| (*k, -*v)).collect(),
            customers: self.customers.iter().map(|(k, v)| (*k, -*v)).collect(),
            stock: self.stock.iter().map(|(k, v)| (*k, -*v)).collect(),
            top_sheets: self.top_sheets.iter().map(|(k, v)| (*k, -*v)).collect(),
            progress: self.progress.iter().map(|(k, v)| (*k, -*v)).collect(),
            transactions: Vec::new(),
        }
    }

    /// `self − other` on every key, without ledger entries.
    pub fn difference(&self, other: &EffectPlan) -> EffectPlan {
        let mut plan = EffectPlan {
            transactions: Vec::new(),
            ..self.clone()
        };
        plan.merge(other.reversed());
        plan
    }

    /// Drop entries whose accumulated delta is zero.
    pub fn prune(&mut self) -> &mut Self {
        self.accounts.retain(|_, v| !v.is_zero());
        self.customers.retain(|_, v| !v.is_zero());
        self.stock.retain(|_, v| *v != 0);
        self.top_sheets.retain(|_, v| !v.is_zero());
        self.progress.retain(|_, v| !v.is_zero());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.customers.is_empty()
            && self.stock.is_empty()
            && self.top_sheets.is_empty()
            && self.progress.is_empty()
            && self.transactions.is_empty()
    }
}

/// Ledger entries that explain net account movements after an edit.
///
/// A positive movement is money received from `counterparty`; a negative one
/// is money handed back to it.
pub fn adjustment_entries(
    branch_id: i64,
    memo_no: &str,
    date: NaiveDate,
    accounts: &BTreeMap<i64, Decimal>,
    counterparty: Party,
) -> Vec<NewTransaction> {
    accounts
        .iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(account_id, amount)| {
            let account = Party::account(*account_id);
            let (from, to) = if amount.is_sign_positive() {
                (counterparty, account)
            } else {
                (account, counterparty)
            };
            NewTransaction {
                branch_id,
                memo_no: memo_no.to_string(),
                from,
                to,
                amount: amount.abs(),
                transaction_type: TransactionType::Adjustment,
                transaction_date: date,
                notes: format!("adjustment for memo {memo_no}"),
            }
        })
        .collect()
}

fn require_account(account: Option<AccountRef>) -> Result<AccountRef, PlanError> {
    account.ok_or(PlanError::MissingPaymentAccount)
}

// ============================================================================
// Orders
// ============================================================================

/// What a pending order contributes to the aggregates, excluding ledger
/// entries.
pub fn pending_footprint(terms: &OrderTerms) -> Result<EffectPlan, PlanError> {
    let mut plan = EffectPlan::new();
    let mut sheet = TopSheetDelta {
        pending: terms.total_items,
        order_count: terms.total_items,
        ..TopSheetDelta::default()
    };

    if terms.advance_payment > Decimal::ZERO {
        let account = require_account(terms.payment_account)?;
        plan.credit_account(account.id, terms.advance_payment);
        sheet += TopSheetDelta::money(account.kind, terms.advance_payment);
    }

    plan.top_sheet(terms.branch_id, terms.order_date, sheet)
        .adjust_due(terms.customer_id, terms.due())
        .progress(
            terms.branch_id,
            terms.order_date,
            terms.salesperson_id,
            ProgressDelta {
                order_count: terms.total_items,
                ..ProgressDelta::default()
            },
        );
    Ok(plan)
}

/// Plan a new pending order.
pub fn plan_create(memo_no: &str, terms: &OrderTerms) -> Result<EffectPlan, PlanError> {
    let mut plan = pending_footprint(terms)?;
    if let Some(account) = terms
        .payment_account
        .filter(|_| terms.advance_payment > Decimal::ZERO)
    {
        plan.record(NewTransaction {
            branch_id: terms.branch_id,
            memo_no: memo_no.to_string(),
            from: Party::customer(terms.customer_id),
            to: Party::account(account.id),
            amount: terms.advance_payment,
            transaction_type: TransactionType::Payment,
            transaction_date: terms.order_date,
            notes: format!("advance payment for order {memo_no}"),
        });
    }
    Ok(plan)
}

/// Plan an edit of a pending order: post `footprint(new) − footprint(old)`
/// and explain net account movement with adjustment entries dated `today`.
pub fn plan_update(
    order: &OrderSnapshot,
    new_terms: &OrderTerms,
    today: NaiveDate,
) -> Result<EffectPlan, PlanError> {
    order.status.next(OrderAction::Update, order.progress())?;

    let mut plan = pending_footprint(new_terms)?.difference(&pending_footprint(&order.terms)?);
    plan.transactions = adjustment_entries(
        new_terms.branch_id,
        &order.memo_no,
        today,
        &plan.accounts,
        Party::customer(new_terms.customer_id),
    );
    Ok(plan)
}

/// Plan moving a pending order to checkout on `today`.
pub fn plan_checkout(
    order: &OrderSnapshot,
    today: NaiveDate,
) -> Result<(OrderStatus, EffectPlan), PlanError> {
    let status = order.status.next(OrderAction::Checkout, order.progress())?;
    let items = order.terms.total_items;

    let mut plan = EffectPlan::new();
    plan.top_sheet(
        order.terms.branch_id,
        today,
        TopSheetDelta {
            pending: -items,
            checkout: items,
            ..TopSheetDelta::default()
        },
    );
    Ok((status, plan))
}

/// One delivery hand-over as requested by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRequest {
    pub items: i64,
    pub paid: Decimal,
    pub account: Option<AccountRef>,
    pub exit_date: NaiveDate,
}

/// The order's new state after a delivery, with the plan to post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: OrderStatus,
    pub delivered_now: i64,
    pub items_delivered: i64,
    pub advance_payment: Decimal,
    pub payment_account: Option<AccountRef>,
    pub plan: EffectPlan,
}

/// Plan a (possibly partial) delivery. Requested items are clamped to what
/// is still outstanding.
pub fn plan_delivery(
    order: &OrderSnapshot,
    request: &DeliveryRequest,
) -> Result<DeliveryOutcome, PlanError> {
    let progress = order.progress();
    let status = order.status.next(OrderAction::Deliver, progress)?;

    let delivered_now = request.items.clamp(0, progress.remaining());
    let paid = request.paid.max(Decimal::ZERO);
    if delivered_now == 0 && paid.is_zero() {
        return Err(TransitionError::EmptyDelivery.into());
    }

    let terms = &order.terms;
    let mut plan = EffectPlan::new();
    let mut sheet = TopSheetDelta {
        checkout: -delivered_now,
        delivery: delivered_now,
        ..TopSheetDelta::default()
    };

    if paid > Decimal::ZERO {
        let account = require_account(request.account)?;
        // Until an item leaves, everything collected is refundable from one account.
        if order.items_delivered + delivered_now == 0 && terms.advance_payment > Decimal::ZERO {
            if let Some(held) = terms.payment_account.filter(|held| held.id != account.id) {
                return Err(PlanError::PaymentAccountMismatch { held: held.id });
            }
        }
        plan.credit_account(account.id, paid)
            .adjust_due(terms.customer_id, -paid)
            .record(NewTransaction {
                branch_id: terms.branch_id,
                memo_no: order.memo_no.clone(),
                from: Party::customer(terms.customer_id),
                to: Party::account(account.id),
                amount: paid,
                transaction_type: TransactionType::Payment,
                transaction_date: request.exit_date,
                notes: format!("delivery payment for order {}", order.memo_no),
            });
        sheet += TopSheetDelta::money(account.kind, paid);
    }
    plan.top_sheet(terms.branch_id, request.exit_date, sheet);

    Ok(DeliveryOutcome {
        status,
        delivered_now,
        items_delivered: order.items_delivered + delivered_now,
        advance_payment: terms.advance_payment + paid,
        payment_account: if paid > Decimal::ZERO && terms.advance_payment.is_zero() {
            request.account
        } else {
            terms.payment_account
        },
        plan,
    })
}

/// Plan cancelling an order on `today`.
///
/// The advance is refunded only when nothing has been delivered; a partial
/// delivery keeps its cash.
pub fn plan_cancel(
    order: &OrderSnapshot,
    today: NaiveDate,
) -> Result<(OrderStatus, EffectPlan), PlanError> {
    let progress = order.progress();
    let status = order.status.next(OrderAction::Cancel, progress)?;
    let terms = &order.terms;
    let remaining = progress.remaining();

    let mut plan = EffectPlan::new();
    let mut sheet = TopSheetDelta {
        cancelled: remaining,
        ..TopSheetDelta::default()
    };
    match order.status {
        OrderStatus::Pending => sheet.pending = -remaining,
        _ => sheet.checkout = -remaining,
    }

    if terms.advance_payment > Decimal::ZERO && order.items_delivered == 0 {
        let account = require_account(terms.payment_account)?;
        plan.credit_account(account.id, -terms.advance_payment)
            .record(NewTransaction {
                branch_id: terms.branch_id,
                memo_no: order.memo_no.clone(),
                from: Party::account(account.id),
                to: Party::customer(terms.customer_id),
                amount: terms.advance_payment,
                transaction_type: TransactionType::Refund,
                transaction_date: today,
                notes: format!("refund for cancelled order {}", order.memo_no),
            });
        sheet += TopSheetDelta::money(account.kind, -terms.advance_payment);
    }

    plan.top_sheet(terms.branch_id, today, sheet)
        .adjust_due(terms.customer_id, -terms.due())
        .progress(
            terms.branch_id,
            today,
            terms.salesperson_id,
            ProgressDelta {
                order_count: -remaining,
                ..ProgressDelta::default()
            },
        );
    Ok((status, plan))
}

// ============================================================================
// Sales
// ============================================================================

/// The full effect of a recorded sale, including its payment entry.
pub fn apply_effects(sale: &Sale) -> Result<EffectPlan, PlanError> {
    let terms = &sale.terms;
    let mut plan = EffectPlan::new();

    for line in &sale.lines {
        plan.adjust_stock(line.product_id, -line.quantity);
    }

    let mut sheet = TopSheetDelta {
        ready_made: sale.item_count(),
        ..TopSheetDelta::default()
    };
    if terms.paid_amount > Decimal::ZERO {
        let account = require_account(terms.payment_account)?;
        plan.credit_account(account.id, terms.paid_amount)
            .record(NewTransaction {
                branch_id: terms.branch_id,
                memo_no: sale.memo_no.clone(),
                from: Party::customer(terms.customer_id),
                to: Party::account(account.id),
                amount: terms.paid_amount,
                transaction_type: TransactionType::Payment,
                transaction_date: terms.sale_date,
                notes: format!("payment for sale {}", sale.memo_no),
            });
        sheet += TopSheetDelta::money(account.kind, terms.paid_amount);
    }

    plan.adjust_due(terms.customer_id, terms.due())
        .top_sheet(terms.branch_id, terms.sale_date, sheet)
        .progress(
            terms.branch_id,
            terms.sale_date,
            terms.salesperson_id,
            ProgressDelta {
                sale_amount: terms.total_payable,
                ..ProgressDelta::default()
            },
        );
    Ok(plan)
}

/// Undo everything [`apply_effects`] posted for `sale`, on the sale's own
/// keys. Ledger entries stay.
pub fn reverse_effects(sale: &Sale) -> Result<EffectPlan, PlanError> {
    Ok(apply_effects(sale)?.reversed())
}

/// Plan a new sale.
pub fn plan_sale_create(sale: &Sale) -> Result<EffectPlan, PlanError> {
    apply_effects(sale)
}

/// Plan rewriting `old` as `new`: reverse the old effects, then apply the
/// new ones. Net account movement is explained by adjustment entries dated
/// `today`.
pub fn plan_sale_update(old: &Sale, new: &Sale, today: NaiveDate) -> Result<EffectPlan, PlanError> {
    let mut plan = reverse_effects(old)?;
    plan.merge(apply_effects(new)?);
    plan.transactions = adjustment_entries(
        new.terms.branch_id,
        &new.memo_no,
        today,
        &plan.accounts,
        Party::customer(new.terms.customer_id),
    );
    Ok(plan)
}

// ============================================================================
// Payroll, purchases, dues and stock
// ============================================================================

/// Plan paying a salary.
pub fn plan_salary(payment: &SalaryPayment) -> EffectPlan {
    let mut plan = EffectPlan::new();
    plan.credit_account(payment.account.id, -payment.amount)
        .top_sheet(
            payment.branch_id,
            payment.paid_on,
            TopSheetDelta::expense(payment.amount),
        )
        .progress(
            payment.branch_id,
            payment.paid_on,
            payment.employee_id,
            ProgressDelta {
                salary: payment.amount,
                ..ProgressDelta::default()
            },
        )
        .record(NewTransaction {
            branch_id: payment.branch_id,
            memo_no: payment.memo_no.clone(),
            from: Party::account(payment.account.id),
            to: Party::employee(payment.employee_id),
            amount: payment.amount,
            transaction_type: TransactionType::Salary,
            transaction_date: payment.paid_on,
            notes: format!("salary for employee {}", payment.employee_id),
        });
    plan
}

/// Plan recording a worker's daily production figures.
pub fn plan_worker_progress(progress: &WorkerProgress) -> EffectPlan {
    let mut plan = EffectPlan::new();
    plan.progress(
        progress.branch_id,
        progress.work_date,
        progress.employee_id,
        ProgressDelta {
            production_units: progress.production_units,
            overtime_hours: progress.overtime_hours,
            advance_payment: progress.advance_payment,
            ..ProgressDelta::default()
        },
    );
    plan
}

fn purchase_footprint(terms: &PurchaseTerms) -> EffectPlan {
    let mut plan = EffectPlan::new();
    plan.credit_account(terms.account.id, -terms.total_amount)
        .top_sheet(
            terms.branch_id,
            terms.purchase_date,
            TopSheetDelta::expense(terms.total_amount),
        );
    plan
}

/// Plan paying a supplier for a purchase.
pub fn plan_purchase(memo_no: &str, terms: &PurchaseTerms) -> EffectPlan {
    let mut plan = purchase_footprint(terms);
    if terms.total_amount > Decimal::ZERO {
        plan.record(NewTransaction {
            branch_id: terms.branch_id,
            memo_no: memo_no.to_string(),
            from: Party::account(terms.account.id),
            to: Party::supplier(terms.supplier_id),
            amount: terms.total_amount,
            transaction_type: TransactionType::Payment,
            transaction_date: terms.purchase_date,
            notes: format!("payment for purchase {memo_no}"),
        });
    }
    plan
}

/// Plan correcting a purchase: the difference of both footprints plus one
/// adjustment entry per account that moved.
pub fn plan_purchase_update(
    memo_no: &str,
    old: &PurchaseTerms,
    new: &PurchaseTerms,
    today: NaiveDate,
) -> EffectPlan {
    let mut plan = purchase_footprint(new).difference(&purchase_footprint(old));
    plan.transactions = adjustment_entries(
        new.branch_id,
        memo_no,
        today,
        &plan.accounts,
        Party::supplier(new.supplier_id),
    );
    plan
}

/// Plan collecting part of a customer's outstanding due.
pub fn plan_due_collection(
    branch_id: i64,
    customer_id: i64,
    amount: Decimal,
    account: AccountRef,
    date: NaiveDate,
    memo_no: &str,
) -> EffectPlan {
    let mut plan = EffectPlan::new();
    plan.credit_account(account.id, amount)
        .adjust_due(customer_id, -amount)
        .top_sheet(branch_id, date, TopSheetDelta::money(account.kind, amount))
        .record(NewTransaction {
            branch_id,
            memo_no: memo_no.to_string(),
            from: Party::customer(customer_id),
            to: Party::account(account.id),
            amount,
            transaction_type: TransactionType::Payment,
            transaction_date: date,
            notes: format!("due collection from customer {customer_id}"),
        });
    plan
}

/// Plan receiving stock.
pub fn plan_restock(lines: &[RestockLine]) -> EffectPlan {
    let mut plan = EffectPlan::new();
    for line in lines {
        plan.adjust_stock(line.product_id, line.quantity);
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountKind, SaleLine, SaleTerms};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn cash() -> AccountRef {
        AccountRef::new(10, AccountKind::Cash)
    }

    fn bank() -> AccountRef {
        AccountRef::new(11, AccountKind::Bank)
    }

    fn terms(total: &str, advance: &str, items: i64) -> OrderTerms {
        OrderTerms {
            branch_id: 1,
            order_date: day(1),
            customer_id: 7,
            salesperson_id: 3,
            total_payable: dec(total),
            advance_payment: dec(advance),
            payment_account: Some(cash()),
            total_items: items,
        }
    }

    fn snapshot(terms: OrderTerms, status: OrderStatus, delivered: i64) -> OrderSnapshot {
        OrderSnapshot {
            id: 42,
            memo_no: "000042".to_string(),
            terms,
            status,
            items_delivered: delivered,
        }
    }

    fn sheet(plan: &EffectPlan, date: NaiveDate) -> TopSheetDelta {
        plan.top_sheets
            .get(&TopSheetKey { branch_id: 1, date })
            .copied()
            .unwrap_or_default()
    }

    #[test]
    fn test_create_posts_advance_and_pending_items() {
        let plan = plan_create("000001", &terms("1000", "200", 4)).unwrap();

        assert_eq!(plan.accounts.get(&10), Some(&dec("200")));
        assert_eq!(plan.customers.get(&7), Some(&dec("800")));
        let row = sheet(&plan, day(1));
        assert_eq!(row.pending, 4);
        assert_eq!(row.order_count, 4);
        assert_eq!(row.cash, dec("200"));
        assert_eq!(row.bank, Decimal::ZERO);

        assert_eq!(plan.transactions.len(), 1);
        let entry = &plan.transactions[0];
        assert_eq!(entry.from, Party::customer(7));
        assert_eq!(entry.to, Party::account(10));
        assert_eq!(entry.transaction_type, TransactionType::Payment);
    }

    #[test]
    fn test_create_without_advance_records_nothing_in_ledger() {
        let mut t = terms("500", "0", 2);
        t.payment_account = None;
        let plan = plan_create("000002", &t).unwrap();
        assert!(plan.accounts.is_empty());
        assert!(plan.transactions.is_empty());
        assert_eq!(plan.customers.get(&7), Some(&dec("500")));
    }

    #[test]
    fn test_create_with_advance_requires_account() {
        let mut t = terms("500", "100", 2);
        t.payment_account = None;
        assert_eq!(
            plan_create("000003", &t),
            Err(PlanError::MissingPaymentAccount)
        );
    }

    #[test]
    fn test_update_with_no_changes_posts_nothing() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Pending, 0);
        let plan = plan_update(&order, &order.terms, day(2)).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_update_moves_advance_between_accounts() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Pending, 0);
        let mut new_terms = order.terms.clone();
        new_terms.payment_account = Some(bank());

        let plan = plan_update(&order, &new_terms, day(2)).unwrap();
        assert_eq!(plan.accounts.get(&10), Some(&dec("-200")));
        assert_eq!(plan.accounts.get(&11), Some(&dec("200")));
        let row = sheet(&plan, day(1));
        assert_eq!(row.cash, dec("-200"));
        assert_eq!(row.bank, dec("200"));
        assert_eq!(row.pending, 0);
        assert!(plan.customers.is_empty());

        assert_eq!(plan.transactions.len(), 2);
        assert!(plan
            .transactions
            .iter()
            .all(|t| t.transaction_type == TransactionType::Adjustment && t.amount == dec("200")));
    }

    #[test]
    fn test_update_is_rejected_after_checkout() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Checkout, 0);
        let err = plan_update(&order, &order.terms, day(2)).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Transition(TransitionError::Illegal { .. })
        ));
    }

    #[test]
    fn test_checkout_moves_items_on_business_date() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Pending, 0);
        let (status, plan) = plan_checkout(&order, day(3)).unwrap();
        assert_eq!(status, OrderStatus::Checkout);
        let row = sheet(&plan, day(3));
        assert_eq!(row.pending, -4);
        assert_eq!(row.checkout, 4);
        assert!(plan.accounts.is_empty());
    }

    #[test]
    fn test_delivery_clamps_items_and_collects_payment() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Checkout, 0);
        let request = DeliveryRequest {
            items: 10,
            paid: dec("300"),
            account: Some(bank()),
            exit_date: day(4),
        };
        let outcome = plan_delivery(&order, &request).unwrap();
        assert_eq!(outcome.delivered_now, 4);
        assert_eq!(outcome.items_delivered, 4);
        assert_eq!(outcome.advance_payment, dec("500"));
        assert_eq!(outcome.status, OrderStatus::Delivery);

        let row = sheet(&outcome.plan, day(4));
        assert_eq!(row.checkout, -4);
        assert_eq!(row.delivery, 4);
        assert_eq!(row.bank, dec("300"));
        assert_eq!(outcome.plan.customers.get(&7), Some(&dec("-300")));
    }

    #[test]
    fn test_delivery_of_nothing_is_rejected() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Delivery, 2);
        let request = DeliveryRequest {
            items: 0,
            paid: Decimal::ZERO,
            account: None,
            exit_date: day(4),
        };
        assert_eq!(
            plan_delivery(&order, &request),
            Err(PlanError::Transition(TransitionError::EmptyDelivery))
        );
    }

    fn pay_only(paid: &str, account: AccountRef) -> DeliveryRequest {
        DeliveryRequest {
            items: 0,
            paid: dec(paid),
            account: Some(account),
            exit_date: day(4),
        }
    }

    #[test]
    fn test_refundable_payment_into_another_account_is_rejected() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Checkout, 0);
        assert_eq!(
            plan_delivery(&order, &pay_only("300", bank())),
            Err(PlanError::PaymentAccountMismatch { held: 10 })
        );

        // Once an item leaves in the same hand-over nothing is refundable.
        let request = DeliveryRequest {
            items: 1,
            ..pay_only("300", bank())
        };
        assert!(plan_delivery(&order, &request).is_ok());
    }

    #[test]
    fn test_payment_only_delivery_then_cancel_refunds_the_holding_account() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Checkout, 0);
        let outcome = plan_delivery(&order, &pay_only("300", cash())).unwrap();
        let mut plan = outcome.plan.clone();

        let order = OrderSnapshot {
            status: outcome.status,
            items_delivered: outcome.items_delivered,
            terms: OrderTerms {
                advance_payment: outcome.advance_payment,
                payment_account: outcome.payment_account,
                ..order.terms
            },
            ..order
        };
        let (_, cancel) = plan_cancel(&order, day(5)).unwrap();
        plan.merge(cancel);

        assert_eq!(plan.accounts.get(&10), Some(&dec("-200")));
        assert!(plan.accounts.get(&11).is_none());
    }

    #[test]
    fn test_first_collection_sets_the_holding_account() {
        let order = snapshot(terms("1000", "0", 4), OrderStatus::Checkout, 0);
        let outcome = plan_delivery(&order, &pay_only("300", bank())).unwrap();
        assert_eq!(outcome.payment_account, Some(bank()));

        let order = OrderSnapshot {
            status: outcome.status,
            terms: OrderTerms {
                advance_payment: outcome.advance_payment,
                payment_account: outcome.payment_account,
                ..order.terms
            },
            ..order
        };
        let (_, cancel) = plan_cancel(&order, day(5)).unwrap();
        assert_eq!(cancel.accounts.get(&11), Some(&dec("-300")));
        assert!(cancel.accounts.get(&10).is_none());
    }

    #[test]
    fn test_cancel_pending_refunds_advance() {
        let order = snapshot(terms("1000", "200", 4), OrderStatus::Pending, 0);
        let (status, plan) = plan_cancel(&order, day(1)).unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
        assert_eq!(plan.accounts.get(&10), Some(&dec("-200")));
        assert_eq!(plan.customers.get(&7), Some(&dec("-800")));
        let row = sheet(&plan, day(1));
        assert_eq!(row.pending, -4);
        assert_eq!(row.cancelled, 4);
        assert_eq!(row.cash, dec("-200"));
        assert_eq!(plan.transactions[0].transaction_type, TransactionType::Refund);
        assert_eq!(plan.transactions[0].from, Party::account(10));
    }

    #[test]
    fn test_cancel_partial_delivery_keeps_cash() {
        let order = snapshot(terms("1000", "500", 4), OrderStatus::Delivery, 1);
        let (_, plan) = plan_cancel(&order, day(5)).unwrap();
        assert!(plan.accounts.is_empty());
        assert!(plan.transactions.is_empty());
        let row = sheet(&plan, day(5));
        assert_eq!(row.checkout, -3);
        assert_eq!(row.cancelled, 3);
        assert_eq!(row.cash, Decimal::ZERO);
        assert_eq!(plan.customers.get(&7), Some(&dec("-500")));
    }

    #[test]
    fn test_cancel_fully_delivered_is_rejected() {
        let order = snapshot(terms("1000", "1000", 4), OrderStatus::Delivery, 4);
        assert_eq!(
            plan_cancel(&order, day(5)),
            Err(PlanError::Transition(TransitionError::FullyDelivered {
                action: OrderAction::Cancel
            }))
        );
    }

    #[test]
    fn test_salary_is_an_expense() {
        let plan = plan_salary(&SalaryPayment {
            branch_id: 1,
            employee_id: 9,
            amount: dec("1500"),
            paid_on: day(30),
            account: cash(),
            memo_no: "SAL0000001".to_string(),
        });
        assert_eq!(plan.accounts.get(&10), Some(&dec("-1500")));
        assert_eq!(sheet(&plan, day(30)).expense, dec("1500"));
        assert_eq!(plan.transactions[0].to, Party::employee(9));
        assert_eq!(plan.transactions[0].transaction_type, TransactionType::Salary);
    }

    #[test]
    fn test_purchase_update_posts_difference() {
        let old = PurchaseTerms {
            branch_id: 1,
            supplier_id: 4,
            purchase_date: day(2),
            total_amount: dec("700"),
            account: cash(),
        };
        let new = PurchaseTerms {
            total_amount: dec("900"),
            ..old.clone()
        };
        let plan = plan_purchase_update("P-1", &old, &new, day(3));
        assert_eq!(plan.accounts.get(&10), Some(&dec("-200")));
        assert_eq!(sheet(&plan, day(2)).expense, dec("200"));
        assert_eq!(plan.transactions.len(), 1);
        assert_eq!(plan.transactions[0].from, Party::account(10));
        assert_eq!(plan.transactions[0].to, Party::supplier(4));
    }

    #[test]
    fn test_merge_prunes_cancelling_deltas() {
        let mut plan = EffectPlan::new();
        plan.credit_account(1, dec("50")).adjust_stock(2, 3);
        let reversed = plan.reversed();
        plan.merge(reversed);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_create_then_cancel_nets_to_zero() {
        let order_terms = terms("1000", "200", 5);
        let mut plan = plan_create("000042", &order_terms).unwrap();
        let order = snapshot(order_terms, OrderStatus::Pending, 0);
        let (_, cancel) = plan_cancel(&order, day(1)).unwrap();
        plan.merge(cancel);

        assert!(plan.accounts.is_empty());
        assert!(plan.customers.is_empty());
        assert!(plan.progress.is_empty());
        let row = sheet(&plan, day(1));
        assert_eq!(row.pending, 0);
        assert_eq!(row.cancelled, 5);
        assert!(row.cash.is_zero());
        assert_eq!(plan.transactions.len(), 2);
        assert_eq!(plan.transactions[1].transaction_type, TransactionType::Refund);
    }

    #[test]
    fn test_checkout_then_cancel_clears_pipeline() {
        let order_terms = terms("300", "0", 4);
        let mut plan = plan_create("000042", &order_terms).unwrap();
        let order = snapshot(order_terms, OrderStatus::Pending, 0);
        let (status, checkout) = plan_checkout(&order, day(1)).unwrap();
        plan.merge(checkout);
        let order = OrderSnapshot { status, ..order };
        let (_, cancel) = plan_cancel(&order, day(1)).unwrap();
        plan.merge(cancel);

        let row = sheet(&plan, day(1));
        assert_eq!(row.pending, 0);
        assert_eq!(row.checkout, 0);
        assert_eq!(row.cancelled, 4);
    }

    #[test]
    fn test_successive_updates_track_current_due() {
        let first = terms("500", "100", 2);
        let mut due = plan_create("000042", &first).unwrap().customers[&7];
        let mut order = snapshot(first, OrderStatus::Pending, 0);

        for (total, advance) in [("800", "100"), ("800", "900")] {
            let next = terms(total, advance, 2);
            let plan = plan_update(&order, &next, day(2)).unwrap();
            due += plan.customers.get(&7).copied().unwrap_or_default();
            assert_eq!(due, next.due());
            order.terms = next;
        }
        assert!(due.is_zero());
    }

    fn sale(paid: &str, quantity: i64) -> Sale {
        Sale {
            memo_no: "000007".to_string(),
            terms: SaleTerms {
                branch_id: 1,
                sale_date: day(4),
                customer_id: 7,
                salesperson_id: 3,
                payment_account: Some(bank()),
                total_payable: dec("450"),
                paid_amount: dec(paid),
            },
            lines: vec![SaleLine {
                product_id: 21,
                quantity,
                total_price: dec("450"),
            }],
        }
    }

    #[test]
    fn test_sale_effects() {
        let plan = plan_sale_create(&sale("400", 3)).unwrap();
        assert_eq!(plan.stock.get(&21), Some(&-3));
        assert_eq!(plan.accounts.get(&11), Some(&dec("400")));
        assert_eq!(plan.customers.get(&7), Some(&dec("50")));
        let row = sheet(&plan, day(4));
        assert_eq!(row.ready_made, 3);
        assert_eq!(row.bank, dec("400"));
        assert_eq!(plan.transactions.len(), 1);
    }

    #[test]
    fn test_identical_sale_update_is_a_no_op() {
        let plan = plan_sale_update(&sale("400", 3), &sale("400", 3), day(5)).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_sale_update_posts_only_the_change() {
        let plan = plan_sale_update(&sale("400", 3), &sale("450", 2), day(5)).unwrap();
        assert_eq!(plan.stock.get(&21), Some(&1));
        assert_eq!(plan.accounts.get(&11), Some(&dec("50")));
        assert_eq!(plan.customers.get(&7), Some(&dec("-50")));
        assert_eq!(plan.transactions.len(), 1);
        assert_eq!(plan.transactions[0].transaction_type, TransactionType::Adjustment);
        assert_eq!(plan.transactions[0].transaction_date, day(5));
    }
}
