//! Ledger service for posting validation and resolution.
//!
//! This module provides the core business logic for validating and resolving
//! postings before they are persisted. It has no storage dependencies:
//! account lookups are supplied by the caller as closures.

use rust_decimal::Decimal;
use tally_shared::types::AccountId;

use super::error::LedgerError;
use super::types::{LegRequest, PostTransactionInput, ResolvedLeg, TransactionStatus, TransactionTotals};

/// Information about an account needed for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Whether the account is active.
    pub is_active: bool,
}

/// Ledger service for posting validation and resolution.
pub struct LedgerService;

impl LedgerService {
    /// Validate and resolve a posting request.
    ///
    /// Steps, in order:
    /// 1. At least 2 legs
    /// 2. Every amount and exchange rate strictly positive
    /// 3. Every account known to the organization and active
    /// 4. Base amounts and their sums fit the decimal range
    /// 5. Base-currency debits equal credits within `tolerance`
    ///
    /// `amount_in_base` is the exact product `amount * exchange_rate`; it is
    /// not rounded, so the balance check sees the true imbalance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` for the first violated rule.
    pub fn validate_and_resolve<A>(
        input: &PostTransactionInput,
        tolerance: Decimal,
        account_lookup: A,
    ) -> Result<(Vec<ResolvedLeg>, TransactionTotals), LedgerError>
    where
        A: Fn(AccountId) -> Option<AccountInfo>,
    {
        if input.legs.len() < 2 {
            return Err(LedgerError::InsufficientLegs(input.legs.len()));
        }

        for (index, leg) in input.legs.iter().enumerate() {
            Self::validate_amounts(index, leg)?;
        }

        let mut resolved = Vec::with_capacity(input.legs.len());
        let mut totals = TransactionTotals::default();

        for (index, leg) in input.legs.iter().enumerate() {
            let info = account_lookup(leg.account_id)
                .ok_or(LedgerError::UnknownAccount(leg.account_id))?;
            if !info.is_active {
                return Err(LedgerError::InactiveAccount(leg.account_id));
            }

            let amount_in_base = leg
                .amount
                .checked_mul(leg.exchange_rate)
                .ok_or(LedgerError::AmountOverflow { index })?;
            totals
                .checked_add(leg.entry_type, leg.currency, leg.amount, amount_in_base)
                .ok_or(LedgerError::AmountOverflow { index })?;
            resolved.push(ResolvedLeg {
                account_id: leg.account_id,
                entry_type: leg.entry_type,
                amount: leg.amount,
                currency: leg.currency,
                exchange_rate: leg.exchange_rate,
                amount_in_base,
                description: leg.description.clone(),
            });
        }

        if !totals.is_balanced_within(tolerance) {
            return Err(LedgerError::UnbalancedTransaction {
                debit: totals.base_debit,
                credit: totals.base_credit,
                imbalance: totals.difference(),
            });
        }

        Ok((resolved, totals))
    }

    fn validate_amounts(index: usize, leg: &LegRequest) -> Result<(), LedgerError> {
        if leg.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                index,
                amount: leg.amount,
            });
        }
        if leg.exchange_rate <= Decimal::ZERO {
            return Err(LedgerError::InvalidExchangeRate {
                index,
                rate: leg.exchange_rate,
            });
        }
        Ok(())
    }

    /// Validate that a transaction can still be changed or discarded.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction is posted or void.
    pub fn validate_is_draft(status: TransactionStatus) -> Result<(), LedgerError> {
        if status.is_editable() {
            Ok(())
        } else {
            Err(LedgerError::CanOnlyChangeDraft)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{EntryType, TransactionType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tally_shared::types::CurrencyCode;

    fn active(id: AccountId) -> Option<AccountInfo> {
        Some(AccountInfo { id, is_active: true })
    }

    fn make_input(legs: Vec<LegRequest>) -> PostTransactionInput {
        PostTransactionInput {
            transaction_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            transaction_type: TransactionType::Journal,
            reference: None,
            description: "Test transaction".to_string(),
            legs,
        }
    }

    fn usd_leg(entry_type: EntryType, amount: Decimal) -> LegRequest {
        match entry_type {
            EntryType::Debit => LegRequest::debit(AccountId::new(), amount, CurrencyCode::USD),
            EntryType::Credit => LegRequest::credit(AccountId::new(), amount, CurrencyCode::USD),
        }
    }

    #[test]
    fn test_balanced_transaction() {
        let input = make_input(vec![
            usd_leg(EntryType::Debit, dec!(100.00)),
            usd_leg(EntryType::Credit, dec!(100.00)),
        ]);

        let (legs, totals) =
            LedgerService::validate_and_resolve(&input, dec!(0.000001), active).unwrap();

        assert_eq!(legs.len(), 2);
        assert_eq!(totals.base_debit, dec!(100.00));
        assert_eq!(totals.base_credit, dec!(100.00));
    }

    #[test]
    fn test_single_leg_rejected() {
        let input = make_input(vec![usd_leg(EntryType::Debit, dec!(100))]);
        let err = LedgerService::validate_and_resolve(&input, dec!(0.000001), active).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientLegs(1)));
    }

    #[test]
    fn test_unbalanced_transaction_reports_imbalance() {
        let input = make_input(vec![
            usd_leg(EntryType::Debit, dec!(100.00)),
            usd_leg(EntryType::Credit, dec!(90.00)),
        ]);
        let err = LedgerService::validate_and_resolve(&input, dec!(0.000001), active).unwrap_err();
        match err {
            LedgerError::UnbalancedTransaction {
                debit,
                credit,
                imbalance,
            } => {
                assert_eq!(debit, dec!(100.00));
                assert_eq!(credit, dec!(90.00));
                assert_eq!(imbalance, dec!(10.00));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_and_negative_amounts_rejected() {
        let input = make_input(vec![
            usd_leg(EntryType::Debit, dec!(0)),
            usd_leg(EntryType::Credit, dec!(0)),
        ]);
        assert!(matches!(
            LedgerService::validate_and_resolve(&input, dec!(0.000001), active),
            Err(LedgerError::NonPositiveAmount { index: 0, .. })
        ));

        let input = make_input(vec![
            usd_leg(EntryType::Debit, dec!(10)),
            usd_leg(EntryType::Credit, dec!(-10)),
        ]);
        assert!(matches!(
            LedgerService::validate_and_resolve(&input, dec!(0.000001), active),
            Err(LedgerError::NonPositiveAmount { index: 1, .. })
        ));
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let input = make_input(vec![
            usd_leg(EntryType::Debit, dec!(10)).with_rate(dec!(0)),
            usd_leg(EntryType::Credit, dec!(10)),
        ]);
        assert!(matches!(
            LedgerService::validate_and_resolve(&input, dec!(0.000001), active),
            Err(LedgerError::InvalidExchangeRate { index: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_and_inactive_accounts() {
        let input = make_input(vec![
            usd_leg(EntryType::Debit, dec!(10)),
            usd_leg(EntryType::Credit, dec!(10)),
        ]);
        let first = input.legs[0].account_id;

        let err = LedgerService::validate_and_resolve(&input, dec!(0.000001), |_| None).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownAccount(id) if id == first));

        let err = LedgerService::validate_and_resolve(&input, dec!(0.000001), |id| {
            Some(AccountInfo { id, is_active: false })
        })
        .unwrap_err();
        assert!(matches!(err, LedgerError::InactiveAccount(id) if id == first));
    }

    #[test]
    fn test_multi_currency_balances_in_base() {
        // 100 EUR at 1.1 = 110 USD
        let input = make_input(vec![
            LegRequest::debit(AccountId::new(), dec!(100), CurrencyCode::EUR).with_rate(dec!(1.1)),
            usd_leg(EntryType::Credit, dec!(110)),
        ]);
        let (legs, totals) =
            LedgerService::validate_and_resolve(&input, dec!(0.000001), active).unwrap();
        assert_eq!(legs[0].amount_in_base, dec!(110.0));
        assert_eq!(totals.by_currency.len(), 2);
    }

    #[test]
    fn test_base_amount_not_rounded() {
        let input = make_input(vec![
            LegRequest::debit(AccountId::new(), dec!(3), CurrencyCode::EUR).with_rate(dec!(0.3333333)),
            usd_leg(EntryType::Credit, dec!(0.9999999)),
        ]);
        let (legs, _) = LedgerService::validate_and_resolve(&input, dec!(0.000001), active).unwrap();
        assert_eq!(legs[0].amount_in_base, dec!(0.9999999));
    }

    #[test]
    fn test_amount_overflow_is_a_validation_error() {
        let input = make_input(vec![
            LegRequest::debit(AccountId::new(), Decimal::MAX, CurrencyCode::EUR).with_rate(dec!(2)),
            usd_leg(EntryType::Credit, dec!(1)),
        ]);
        let err = LedgerService::validate_and_resolve(&input, dec!(0.000001), active).unwrap_err();
        assert!(matches!(err, LedgerError::AmountOverflow { index: 0 }));

        let input = make_input(vec![
            usd_leg(EntryType::Debit, Decimal::MAX),
            usd_leg(EntryType::Debit, Decimal::MAX),
            usd_leg(EntryType::Credit, dec!(1)),
        ]);
        let err = LedgerService::validate_and_resolve(&input, dec!(0.000001), active).unwrap_err();
        assert!(matches!(err, LedgerError::AmountOverflow { index: 1 }));
    }

    #[test]
    fn test_validate_is_draft() {
        assert!(LedgerService::validate_is_draft(TransactionStatus::Draft).is_ok());
        assert!(matches!(
            LedgerService::validate_is_draft(TransactionStatus::Posted),
            Err(LedgerError::CanOnlyChangeDraft)
        ));
        assert!(LedgerService::validate_is_draft(TransactionStatus::Void).is_err());
    }
}
