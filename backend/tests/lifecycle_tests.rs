//! Property tests for the order lifecycle planner
//!
//! The backend posts whatever the planner returns, so these properties
//! describe what reaches the aggregates and the ledger.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    diff_items, plan_cancel, plan_create, plan_delivery, plan_update, AccountKind, AccountRef,
    DeliveryRequest, OrderLine, OrderSnapshot, OrderStatus, OrderTerms, TopSheetKey,
};
use std::collections::BTreeMap;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
}

fn cash() -> AccountRef {
    AccountRef::new(1, AccountKind::Cash)
}

fn terms(total_cents: i64, advance_cents: i64, items: i64) -> OrderTerms {
    OrderTerms {
        branch_id: 1,
        order_date: day(),
        customer_id: 9,
        salesperson_id: 4,
        total_payable: Decimal::new(total_cents, 2),
        advance_payment: Decimal::new(advance_cents, 2),
        payment_account: Some(cash()),
        total_items: items,
    }
}

fn snapshot(terms: OrderTerms, status: OrderStatus, delivered: i64) -> OrderSnapshot {
    OrderSnapshot {
        id: 1,
        memo_no: "000001".to_string(),
        terms,
        status,
        items_delivered: delivered,
    }
}

/// Totals with the advance no larger than the total
fn money() -> impl Strategy<Value = (i64, i64)> {
    (1i64..1_000_000).prop_flat_map(|total| (Just(total), 0..=total))
}

fn lines() -> impl Strategy<Value = Vec<OrderLine>> {
    prop::collection::btree_map(1i64..20, (1i64..50, 1i64..100_000), 0..8).prop_map(|m| {
        m.into_iter()
            .map(|(product_id, (quantity, cents))| OrderLine {
                product_id,
                quantity,
                subtotal: Decimal::new(cents, 2),
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Creating and cancelling a pending order on the same day leaves
    /// balances and dues where they started.
    #[test]
    fn property_cancel_undoes_create(
        (total, advance) in money(),
        items in 1i64..500,
    ) {
        let terms = terms(total, advance, items);
        let mut plan = plan_create("000001", &terms).unwrap();
        let order = snapshot(terms, OrderStatus::Pending, 0);
        let (status, cancel) = plan_cancel(&order, day()).unwrap();
        plan.merge(cancel);

        prop_assert_eq!(status, OrderStatus::Cancelled);
        prop_assert!(plan.accounts.is_empty());
        prop_assert!(plan.customers.is_empty());

        let sheet = plan.top_sheets[&TopSheetKey { branch_id: 1, date: day() }];
        prop_assert_eq!(sheet.pending, 0);
        prop_assert_eq!(sheet.cancelled, items);
        prop_assert!(sheet.cash.is_zero());

        let entries = if advance > 0 { 2 } else { 0 };
        prop_assert_eq!(plan.transactions.len(), entries);
    }

    /// Deliveries never push the delivered count past the order size.
    #[test]
    fn property_delivery_is_clamped(
        items in 1i64..500,
        delivered_fraction in 0i64..100,
        requested in -50i64..1000,
        paid_cents in 0i64..100_000,
    ) {
        let delivered = items * delivered_fraction / 100;
        let status = if delivered == 0 { OrderStatus::Checkout } else { OrderStatus::Delivery };
        let order = snapshot(terms(500_000, 0, items), status, delivered);
        let request = DeliveryRequest {
            items: requested,
            paid: Decimal::new(paid_cents, 2),
            account: Some(cash()),
            exit_date: day(),
        };

        match plan_delivery(&order, &request) {
            Ok(outcome) => {
                prop_assert!(outcome.delivered_now >= 0);
                prop_assert!(outcome.items_delivered <= items);
                prop_assert_eq!(outcome.items_delivered, delivered + outcome.delivered_now);
                let sheet = outcome.plan.top_sheets[&TopSheetKey { branch_id: 1, date: day() }];
                prop_assert_eq!(sheet.delivery, outcome.delivered_now);
                prop_assert_eq!(sheet.checkout, -outcome.delivered_now);
            }
            Err(_) => {
                prop_assert!(requested.clamp(0, items - delivered) == 0 && paid_cents == 0);
            }
        }
    }

    /// An edit that changes nothing posts nothing.
    #[test]
    fn property_identical_update_is_empty(
        (total, advance) in money(),
        items in 0i64..500,
    ) {
        let terms = terms(total, advance, items);
        let order = snapshot(terms.clone(), OrderStatus::Pending, 0);
        let plan = plan_update(&order, &terms, day()).unwrap();
        prop_assert!(plan.is_empty());
    }

    /// Changing the advance moves exactly the difference through the account
    /// and explains it with one adjustment entry.
    #[test]
    fn property_update_posts_advance_difference(
        (total, old_advance) in money(),
        new_fraction in 0i64..=100,
    ) {
        let new_advance = total * new_fraction / 100;
        let order = snapshot(terms(total, old_advance, 3), OrderStatus::Pending, 0);
        let plan = plan_update(&order, &terms(total, new_advance, 3), day()).unwrap();

        let moved = plan.accounts.get(&1).copied().unwrap_or_default();
        prop_assert_eq!(moved, Decimal::new(new_advance - old_advance, 2));
        let due = plan.customers.get(&9).copied().unwrap_or_default();
        prop_assert_eq!(due, -moved);
        let expected_entries = usize::from(new_advance != old_advance);
        prop_assert_eq!(plan.transactions.len(), expected_entries);
    }

    /// Applying an item diff to the stored lines yields the edited lines.
    #[test]
    fn property_item_diff_reconstructs_edit(old in lines(), new in lines()) {
        let diff = diff_items(&old, &new);
        let mut rows: BTreeMap<i64, OrderLine> =
            old.iter().map(|l| (l.product_id, *l)).collect();
        for id in &diff.deletes {
            rows.remove(id);
        }
        for line in diff.inserts.iter().chain(diff.updates.iter()) {
            rows.insert(line.product_id, *line);
        }
        let expected: BTreeMap<i64, OrderLine> =
            new.iter().map(|l| (l.product_id, *l)).collect();
        prop_assert_eq!(rows, expected);
    }
}
