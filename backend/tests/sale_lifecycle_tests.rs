//! Sale lifecycle tests
//!
//! A sale update reverses the old sale's effects and applies the new ones.
//! The books after create + update must match a fresh create of the new sale.

mod common;

use common::{day, dec, Books};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    apply_effects, plan_sale_create, plan_sale_update, reverse_effects, AccountKind, AccountRef,
    PlanError, Sale, SaleLine, SaleTerms, TransactionType,
};

const CASH: AccountRef = AccountRef {
    id: 10,
    kind: AccountKind::Cash,
};
const BANK: AccountRef = AccountRef {
    id: 11,
    kind: AccountKind::Bank,
};

fn sale(total: &str, paid: &str, lines: Vec<SaleLine>) -> Sale {
    Sale {
        memo_no: "000010".to_string(),
        terms: SaleTerms {
            branch_id: 1,
            sale_date: day(2),
            customer_id: 7,
            salesperson_id: 3,
            payment_account: Some(CASH),
            total_payable: dec(total),
            paid_amount: dec(paid),
        },
        lines,
    }
}

fn line(product_id: i64, quantity: i64, total_price: &str) -> SaleLine {
    SaleLine {
        product_id,
        quantity,
        total_price: dec(total_price),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_create_touches_every_aggregate() {
        let s = sale("900", "600", vec![line(1, 2, "500"), line(2, 1, "400")]);
        let mut books = Books::default();
        books.post(&plan_sale_create(&s).unwrap());

        assert_eq!(books.stock_of(1), -2);
        assert_eq!(books.stock_of(2), -1);
        assert_eq!(books.account(CASH.id), dec("600"));
        assert_eq!(books.due(7), dec("300"));
        let sheet = books.sheet_total(1);
        assert_eq!(sheet.ready_made, 3);
        assert_eq!(sheet.cash, dec("600"));
        assert_eq!(books.progress_total(3).sale_amount, dec("900"));
        assert_eq!(books.ledger.len(), 1);
        assert_eq!(books.ledger[0].transaction_type, TransactionType::Payment);
    }

    #[test]
    fn test_unpaid_sale_needs_no_account() {
        let mut s = sale("300", "0", vec![line(1, 1, "300")]);
        s.terms.payment_account = None;
        let plan = plan_sale_create(&s).unwrap();
        assert!(plan.accounts.is_empty());
        assert!(plan.transactions.is_empty());
    }

    #[test]
    fn test_paid_sale_without_account_is_rejected() {
        let mut s = sale("300", "100", vec![line(1, 1, "300")]);
        s.terms.payment_account = None;
        assert_eq!(
            plan_sale_create(&s),
            Err(PlanError::MissingPaymentAccount)
        );
    }

    #[test]
    fn test_identical_update_is_a_no_op() {
        let s = sale("900", "600", vec![line(1, 2, "500"), line(2, 1, "400")]);
        let plan = plan_sale_update(&s, &s, day(3)).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_reverse_undoes_apply() {
        let s = sale("900", "600", vec![line(1, 2, "500"), line(2, 1, "400")]);
        let mut books = Books::default();
        books.post(&apply_effects(&s).unwrap());
        books.post(&reverse_effects(&s).unwrap());
        assert_eq!(books.aggregates(), Books::default());
    }

    #[test]
    fn test_update_switching_account_records_adjustments() {
        let old = sale("900", "600", vec![line(1, 2, "500"), line(2, 1, "400")]);
        let mut new = old.clone();
        new.terms.payment_account = Some(BANK);

        let mut books = Books::default();
        books.post(&plan_sale_create(&old).unwrap());
        books.post(&plan_sale_update(&old, &new, day(3)).unwrap());

        assert_eq!(books.account(CASH.id), Decimal::ZERO);
        assert_eq!(books.account(BANK.id), dec("600"));
        assert_eq!(books.ledger_net(CASH.id), Decimal::ZERO);
        assert_eq!(books.ledger_net(BANK.id), dec("600"));
        let adjustments = books
            .ledger
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Adjustment)
            .count();
        assert_eq!(adjustments, 2);
    }

    #[test]
    fn test_update_restocks_removed_lines() {
        let old = sale("900", "900", vec![line(1, 2, "500"), line(2, 1, "400")]);
        let new = sale("500", "500", vec![line(1, 2, "500")]);

        let mut books = Books::default();
        books.post(&plan_sale_create(&old).unwrap());
        books.post(&plan_sale_update(&old, &new, day(3)).unwrap());

        assert_eq!(books.stock_of(1), -2);
        assert_eq!(books.stock_of(2), 0);
        assert_eq!(books.account(CASH.id), dec("500"));
        assert_eq!(books.sheet_total(1).ready_made, 2);
        assert_eq!(books.progress_total(3).sale_amount, dec("500"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn lines_strategy() -> impl Strategy<Value = Vec<SaleLine>> {
        prop::collection::btree_map(1i64..6, (1i64..5, 1i64..1000), 1..4).prop_map(|m| {
            m.into_iter()
                .map(|(product_id, (quantity, price))| SaleLine {
                    product_id,
                    quantity,
                    total_price: Decimal::from(price),
                })
                .collect()
        })
    }

    fn sale_strategy() -> impl Strategy<Value = Sale> {
        (
            lines_strategy(),
            0i64..=100,
            any::<bool>(),
            7i64..9,
            3i64..5,
            1u32..4,
        )
            .prop_map(|(lines, paid_pct, bank, customer, salesperson, sale_day)| {
                let total: Decimal = lines.iter().map(|l| l.total_price).sum();
                Sale {
                    memo_no: "000010".to_string(),
                    terms: SaleTerms {
                        branch_id: 1,
                        sale_date: day(sale_day),
                        customer_id: customer,
                        salesperson_id: salesperson,
                        payment_account: Some(if bank { BANK } else { CASH }),
                        total_payable: total,
                        paid_amount: total * Decimal::from(paid_pct) / Decimal::from(100),
                    },
                    lines,
                }
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Create then update leaves the same aggregates as creating the
        /// updated sale directly
        #[test]
        fn prop_update_equals_fresh_create(old in sale_strategy(), new in sale_strategy()) {
            let mut updated = Books::default();
            updated.post(&plan_sale_create(&old).unwrap());
            updated.post(&plan_sale_update(&old, &new, day(5)).unwrap());

            let mut fresh = Books::default();
            fresh.post(&plan_sale_create(&new).unwrap());

            prop_assert_eq!(updated.aggregates(), fresh.aggregates());
            prop_assert_eq!(updated.ledger_net(CASH.id), updated.account(CASH.id));
            prop_assert_eq!(updated.ledger_net(BANK.id), updated.account(BANK.id));
        }

        /// Resubmitting an unchanged sale is a no-op on every aggregate
        #[test]
        fn prop_identical_update_is_no_op(s in sale_strategy()) {
            let plan = plan_sale_update(&s, &s, day(5)).unwrap();
            prop_assert!(plan.is_empty());
        }
    }
}
