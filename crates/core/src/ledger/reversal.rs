//! Reversal of posted transactions.
//!
//! A reversal is a new transaction whose legs mirror the original: every
//! debit becomes a credit and vice versa, with the same amount, currency and
//! exchange rate. The original is never touched.

use chrono::NaiveDate;

use super::error::LedgerError;
use super::transaction::Transaction;
use super::types::{LegRequest, PostTransactionInput, TransactionStatus, TransactionType};

/// Stateless service for building reversing postings.
pub struct ReversalService;

impl ReversalService {
    /// Checks that `original` may be reversed.
    ///
    /// Only posted, non-reversal transactions qualify. Whether a reversal
    /// already exists is checked separately against storage.
    ///
    /// # Errors
    ///
    /// Returns `NotPosted` or `CannotReverseReversal`.
    pub fn validate_reversible(original: &Transaction) -> Result<(), LedgerError> {
        if original.is_reversal() {
            return Err(LedgerError::CannotReverseReversal(original.id));
        }
        if original.status != TransactionStatus::Posted {
            return Err(LedgerError::NotPosted {
                id: original.id,
                status: original.status,
            });
        }
        Ok(())
    }

    /// Builds the mirror-image posting for `original`.
    ///
    /// Line memos are prefixed with "Reversal: ". The reversal is dated
    /// `reversal_date`, defaulting to the original date when `None`.
    #[must_use]
    pub fn build_reversal(
        original: &Transaction,
        reason: &str,
        reversal_date: Option<NaiveDate>,
    ) -> PostTransactionInput {
        let legs = original
            .entries
            .iter()
            .map(|entry| LegRequest {
                account_id: entry.account_id,
                entry_type: entry.entry_type.opposite(),
                amount: entry.amount,
                currency: entry.currency,
                exchange_rate: entry.exchange_rate,
                description: Some(format!(
                    "Reversal: {}",
                    entry.description.clone().unwrap_or_default()
                )),
            })
            .collect();

        PostTransactionInput {
            transaction_date: reversal_date.unwrap_or(original.transaction_date),
            transaction_type: TransactionType::Reversal,
            reference: original.reference.clone(),
            description: format!(
                "Reversal of {}. Reason: {reason}",
                original.transaction_number
            ),
            legs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::entry::LedgerEntry;
    use crate::ledger::types::{DocumentReference, EntryType};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tally_shared::types::{
        AccountId, CurrencyCode, LedgerEntryId, OrganizationId, TransactionId,
    };

    fn entry(txn: TransactionId, entry_type: EntryType, amount: rust_decimal::Decimal) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            transaction_id: txn,
            account_id: AccountId::new(),
            entry_type,
            amount,
            currency: CurrencyCode::EUR,
            exchange_rate: dec!(1.2),
            amount_in_base: amount * dec!(1.2),
            description: Some("Office supplies".to_string()),
            reconciled: false,
        }
    }

    fn posted() -> Transaction {
        let id = TransactionId::new();
        Transaction {
            id,
            organization_id: OrganizationId::new(),
            transaction_number: "TXN-202603-000007".to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            transaction_type: TransactionType::Bill,
            status: TransactionStatus::Posted,
            reference: Some(DocumentReference::new("BILL", "B-1")),
            description: "Supplies".to_string(),
            reverses_transaction_id: None,
            created_at: Utc::now(),
            posted_at: Some(Utc::now()),
            entries: vec![
                entry(id, EntryType::Debit, dec!(100)),
                entry(id, EntryType::Credit, dec!(100)),
            ],
        }
    }

    #[test]
    fn test_build_reversal_mirrors_legs() {
        let original = posted();
        let reversal = ReversalService::build_reversal(&original, "Duplicate entry", None);

        assert_eq!(reversal.transaction_type, TransactionType::Reversal);
        assert_eq!(reversal.transaction_date, original.transaction_date);
        assert_eq!(reversal.reference, original.reference);
        assert!(reversal.description.contains("TXN-202603-000007"));
        assert!(reversal.description.ends_with("Reason: Duplicate entry"));

        for (leg, entry) in reversal.legs.iter().zip(&original.entries) {
            assert_eq!(leg.account_id, entry.account_id);
            assert_eq!(leg.entry_type, entry.entry_type.opposite());
            assert_eq!(leg.amount, entry.amount);
            assert_eq!(leg.currency, entry.currency);
            assert_eq!(leg.exchange_rate, entry.exchange_rate);
            assert!(leg.description.as_deref().unwrap().starts_with("Reversal: "));
        }
    }

    #[test]
    fn test_reversal_date_override() {
        let original = posted();
        let later = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let reversal = ReversalService::build_reversal(&original, "late", Some(later));
        assert_eq!(reversal.transaction_date, later);
    }

    #[test]
    fn test_only_posted_reversible() {
        let mut txn = posted();
        assert!(ReversalService::validate_reversible(&txn).is_ok());

        txn.status = TransactionStatus::Draft;
        assert!(matches!(
            ReversalService::validate_reversible(&txn),
            Err(LedgerError::NotPosted { status: TransactionStatus::Draft, .. })
        ));
    }

    #[test]
    fn test_reversal_of_reversal_rejected() {
        let mut txn = posted();
        txn.transaction_type = TransactionType::Reversal;
        txn.reverses_transaction_id = Some(TransactionId::new());
        assert!(matches!(
            ReversalService::validate_reversible(&txn),
            Err(LedgerError::CannotReverseReversal(_))
        ));
    }
}
