//! Property-based tests for ReversalService.
//!
//! Reversing any posted transaction and summing both transactions' entries
//! per account leaves every account unchanged.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, CurrencyCode, OrganizationId, TransactionId};

use super::entry::LedgerEntry;
use super::reversal::ReversalService;
use super::service::{AccountInfo, LedgerService};
use super::transaction::Transaction;
use super::types::{EntryType, LegRequest, PostTransactionInput, TransactionStatus, TransactionType};

/// Strategy for generating random positive Decimal amounts.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for a balanced set of 1-4 debit/credit pairs over a small
/// pool of accounts, so accounts repeat across legs.
fn arb_balanced_legs() -> impl Strategy<Value = Vec<LegRequest>> {
    let pool: Vec<AccountId> = (0..4).map(|_| AccountId::new()).collect();
    prop::collection::vec((0usize..4, 0usize..4, arb_amount()), 1..=4).prop_map(move |pairs| {
        pairs
            .into_iter()
            .flat_map(|(d, c, amount)| {
                [
                    LegRequest::debit(pool[d], amount, CurrencyCode::USD),
                    LegRequest::credit(pool[c], amount, CurrencyCode::USD),
                ]
            })
            .collect()
    })
}

fn post(legs: Vec<LegRequest>) -> Transaction {
    let input = PostTransactionInput {
        transaction_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        transaction_type: TransactionType::Journal,
        reference: None,
        description: "Generated".to_string(),
        legs,
    };
    let (resolved, _) = LedgerService::validate_and_resolve(&input, Decimal::ZERO, |id| {
        Some(AccountInfo { id, is_active: true })
    })
    .unwrap();
    let id = TransactionId::new();
    Transaction {
        id,
        organization_id: OrganizationId::new(),
        transaction_number: "TXN-202605-000001".to_string(),
        transaction_date: input.transaction_date,
        transaction_type: input.transaction_type,
        status: TransactionStatus::Posted,
        reference: None,
        description: input.description,
        reverses_transaction_id: None,
        created_at: Utc::now(),
        posted_at: Some(Utc::now()),
        entries: resolved
            .into_iter()
            .map(|leg| LedgerEntry::from_leg(id, leg))
            .collect(),
    }
}

fn net_by_account(
    entries: impl Iterator<Item = (AccountId, EntryType, Decimal)>,
) -> HashMap<AccountId, Decimal> {
    let mut net = HashMap::new();
    for (account, entry_type, amount) in entries {
        let signed = match entry_type {
            EntryType::Debit => amount,
            EntryType::Credit => -amount,
        };
        *net.entry(account).or_insert(Decimal::ZERO) += signed;
    }
    net
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 4.1: Reversal round trip nets to zero per account**
    ///
    /// *For any* posted transaction T, T's entries plus the reversal's legs
    /// SHALL net to zero on every touched account.
    #[test]
    fn prop_reversal_nets_to_zero(legs in arb_balanced_legs()) {
        let original = post(legs);
        let reversal = ReversalService::build_reversal(&original, "test", None);

        let combined = original
            .entries
            .iter()
            .map(|e| (e.account_id, e.entry_type, e.amount_in_base))
            .chain(reversal.legs.iter().map(|l| (l.account_id, l.entry_type, l.amount * l.exchange_rate)));

        for (account, net) in net_by_account(combined) {
            prop_assert!(net.is_zero(), "account {} nets to {}", account, net);
        }
    }

    /// **Property 4.2: Reversal is itself balanced**
    ///
    /// *For any* posted transaction, the reversal input SHALL pass validation
    /// with zero tolerance.
    #[test]
    fn prop_reversal_is_balanced(legs in arb_balanced_legs()) {
        let original = post(legs);
        let reversal = ReversalService::build_reversal(&original, "test", None);
        let result = LedgerService::validate_and_resolve(&reversal, Decimal::ZERO, |id| {
            Some(AccountInfo { id, is_active: true })
        });
        prop_assert!(result.is_ok());
        prop_assert_eq!(reversal.legs.len(), original.entries.len());
    }
}
