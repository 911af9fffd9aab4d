//! Ledger entry domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CurrencyCode, LedgerEntryId, TransactionId};

use super::types::{EntryType, ResolvedLeg};

/// A single ledger entry in a transaction.
///
/// Each transaction consists of multiple entries that must balance in base
/// currency (debits = credits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: LedgerEntryId,
    /// The transaction this entry belongs to.
    pub transaction_id: TransactionId,
    /// The account affected by this entry.
    pub account_id: AccountId,
    /// Whether this is a debit or credit.
    pub entry_type: EntryType,
    /// Amount in the entry currency, always positive.
    pub amount: Decimal,
    /// Entry currency.
    pub currency: CurrencyCode,
    /// Rate converting `currency` into the organization's base currency.
    pub exchange_rate: Decimal,
    /// Amount in the organization's base currency.
    pub amount_in_base: Decimal,
    /// Optional description for this line item.
    pub description: Option<String>,
    /// Bank reconciliation flag, maintained outside the ledger core.
    pub reconciled: bool,
}

impl LedgerEntry {
    /// Materializes a validated leg as an entry of `transaction_id`.
    #[must_use]
    pub fn from_leg(transaction_id: TransactionId, leg: ResolvedLeg) -> Self {
        Self {
            id: LedgerEntryId::new(),
            transaction_id,
            account_id: leg.account_id,
            entry_type: leg.entry_type,
            amount: leg.amount,
            currency: leg.currency,
            exchange_rate: leg.exchange_rate,
            amount_in_base: leg.amount_in_base,
            description: leg.description,
            reconciled: false,
        }
    }

    /// Base amount if this is a debit, else zero.
    #[must_use]
    pub fn debit_in_base(&self) -> Decimal {
        match self.entry_type {
            EntryType::Debit => self.amount_in_base,
            EntryType::Credit => Decimal::ZERO,
        }
    }

    /// Base amount if this is a credit, else zero.
    #[must_use]
    pub fn credit_in_base(&self) -> Decimal {
        match self.entry_type {
            EntryType::Debit => Decimal::ZERO,
            EntryType::Credit => self.amount_in_base,
        }
    }
}
