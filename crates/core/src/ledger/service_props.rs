//! Property-based tests for LedgerService.
//!
//! - Property 1: Transaction Balance Integrity
//! - Property 2: Base Amount Correctness

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, CurrencyCode};

use super::error::LedgerError;
use super::service::{AccountInfo, LedgerService};
use super::types::{EntryType, LegRequest, PostTransactionInput, TransactionType};

const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive exchange rates (0.0001 to 100.0000).
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|v| Decimal::new(v, 4))
}

/// Strategy to generate currency codes.
fn currency_code() -> impl Strategy<Value = CurrencyCode> {
    prop_oneof![
        Just(CurrencyCode::USD),
        Just(CurrencyCode::EUR),
        Just(CurrencyCode::UGX),
        Just(CurrencyCode::JPY),
    ]
}

/// Strategy for a single foreign-currency leg on a random side.
fn arb_leg() -> impl Strategy<Value = LegRequest> {
    (any::<bool>(), positive_amount(), currency_code(), positive_rate()).prop_map(
        |(is_debit, amount, currency, rate)| {
            let leg = if is_debit {
                LegRequest::debit(AccountId::new(), amount, currency)
            } else {
                LegRequest::credit(AccountId::new(), amount, currency)
            };
            leg.with_rate(rate)
        },
    )
}

/// Random legs plus one base-currency leg that closes the imbalance.
fn arb_balanced_legs() -> impl Strategy<Value = Vec<LegRequest>> {
    prop::collection::vec(arb_leg(), 1..8).prop_filter_map("already balanced", |mut legs| {
        let imbalance: Decimal = legs
            .iter()
            .map(|leg| match leg.entry_type {
                EntryType::Debit => leg.amount * leg.exchange_rate,
                EntryType::Credit => -(leg.amount * leg.exchange_rate),
            })
            .sum();
        if imbalance.is_zero() {
            return None;
        }
        let closing = if imbalance > Decimal::ZERO {
            LegRequest::credit(AccountId::new(), imbalance, CurrencyCode::USD)
        } else {
            LegRequest::debit(AccountId::new(), -imbalance, CurrencyCode::USD)
        };
        legs.push(closing);
        Some(legs)
    })
}

fn make_input(legs: Vec<LegRequest>) -> PostTransactionInput {
    PostTransactionInput {
        transaction_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        transaction_type: TransactionType::Journal,
        reference: None,
        description: "Test transaction".to_string(),
        legs,
    }
}

fn all_active(id: AccountId) -> Option<AccountInfo> {
    Some(AccountInfo { id, is_active: true })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Property 1: Transaction Balance Integrity
    // =========================================================================

    /// Property 1.1: Balanced multi-currency postings are accepted.
    ///
    /// *For any* set of legs whose base amounts sum to zero, validation SHALL
    /// succeed and base debits SHALL equal base credits exactly.
    #[test]
    fn prop_balanced_multi_currency_accepted(legs in arb_balanced_legs()) {
        let input = make_input(legs);
        let result = LedgerService::validate_and_resolve(&input, TOLERANCE, all_active);

        prop_assert!(result.is_ok(), "Balanced posting should be accepted: {:?}", result.err());
        let (resolved, totals) = result.unwrap();
        prop_assert_eq!(resolved.len(), input.legs.len());
        prop_assert_eq!(totals.base_debit, totals.base_credit);
    }

    /// Property 1.2: Perturbed postings are rejected with the imbalance.
    ///
    /// *For any* balanced set, adding one more cent to a leg SHALL fail with
    /// UnbalancedTransaction carrying a non-zero imbalance.
    #[test]
    fn prop_perturbed_posting_rejected(legs in arb_balanced_legs()) {
        let mut legs = legs;
        let last = legs.len() - 1;
        legs[last].amount += Decimal::new(1, 2);
        let input = make_input(legs);

        let result = LedgerService::validate_and_resolve(&input, TOLERANCE, all_active);
        match result {
            Err(LedgerError::UnbalancedTransaction { imbalance, debit, credit }) => {
                prop_assert_eq!(imbalance, debit - credit);
                prop_assert!(imbalance.abs() > TOLERANCE);
            }
            other => prop_assert!(false, "expected UnbalancedTransaction, got {:?}", other),
        }
    }

    /// Property 1.3: Mismatched two-leg postings are rejected.
    #[test]
    fn prop_unbalanced_pair_rejected(
        debit_amount in positive_amount(),
        credit_amount in positive_amount(),
    ) {
        prop_assume!(debit_amount != credit_amount);
        let input = make_input(vec![
            LegRequest::debit(AccountId::new(), debit_amount, CurrencyCode::USD),
            LegRequest::credit(AccountId::new(), credit_amount, CurrencyCode::USD),
        ]);

        let result = LedgerService::validate_and_resolve(&input, TOLERANCE, all_active);
        let is_unbalanced = matches!(result, Err(LedgerError::UnbalancedTransaction { .. }));
        prop_assert!(is_unbalanced);
    }

    // =========================================================================
    // Property 2: Base Amount Correctness
    // =========================================================================

    /// Property 2.1: Base amount equals amount * rate, unrounded.
    #[test]
    fn prop_base_amount_is_exact_product(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let base = amount * rate;
        let input = make_input(vec![
            LegRequest::debit(AccountId::new(), amount, CurrencyCode::EUR).with_rate(rate),
            LegRequest::credit(AccountId::new(), base, CurrencyCode::USD),
        ]);

        let (resolved, _) = LedgerService::validate_and_resolve(&input, TOLERANCE, all_active).unwrap();
        prop_assert_eq!(resolved[0].amount_in_base, base);
        prop_assert_eq!(resolved[0].exchange_rate, rate);
        prop_assert_eq!(resolved[1].amount_in_base, base);
    }
}
