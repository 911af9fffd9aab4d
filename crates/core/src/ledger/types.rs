//! Ledger domain types for posting requests and their validated form.
//!
//! This module defines the core types used for creating and validating
//! financial transactions in the double-entry bookkeeping system.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CurrencyCode};

/// Entry type: either Debit or Credit.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts, decrease liability/equity/revenue accounts
/// - Credits decrease asset/expense accounts, increase liability/equity/revenue accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    /// Debit entry.
    Debit,
    /// Credit entry.
    Credit,
}

impl EntryType {
    /// Returns the mirror side, used when reversing.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "DEBIT",
            Self::Credit => "CREDIT",
        }
    }
}

/// Transaction type classification.
///
/// Tags the business event a transaction records. Reports use it to decide
/// cash-basis inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Customer sale (invoice or cash sale).
    Sale,
    /// Vendor bill.
    Bill,
    /// Money received against a receivable.
    Receipt,
    /// Money paid against a payable.
    Payment,
    /// Movement between two bank/cash accounts.
    BankTransfer,
    /// Mirror image of an earlier posted transaction.
    Reversal,
    /// Manual journal entry.
    Journal,
    /// Inventory or other adjustment.
    Adjustment,
}

impl TransactionType {
    /// All transaction types.
    pub const ALL: [Self; 8] = [
        Self::Sale,
        Self::Bill,
        Self::Receipt,
        Self::Payment,
        Self::BankTransfer,
        Self::Reversal,
        Self::Journal,
        Self::Adjustment,
    ];

    /// Returns true for types that are themselves a movement of cash.
    #[must_use]
    pub const fn is_cash_native(self) -> bool {
        matches!(self, Self::Receipt | Self::Payment | Self::BankTransfer)
    }

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Bill => "BILL",
            Self::Receipt => "RECEIPT",
            Self::Payment => "PAYMENT",
            Self::BankTransfer => "BANK_TRANSFER",
            Self::Reversal => "REVERSAL",
            Self::Journal => "JOURNAL",
            Self::Adjustment => "ADJUSTMENT",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown transaction type: {s}"))
    }
}

/// Transaction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// Transaction is being drafted and can be modified or discarded.
    Draft,
    /// Transaction has been posted to the ledger (immutable).
    Posted,
    /// Draft that was abandoned but kept for the numbering audit trail.
    Void,
}

impl TransactionStatus {
    /// Returns true if the transaction can be modified.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the transaction is immutable.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::Posted | Self::Void)
    }

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Posted => "POSTED",
            Self::Void => "VOID",
        }
    }
}

/// Back-link from a transaction to the business document that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentReference {
    /// Kind of document, e.g. "INVOICE", "BILL", "TRANSFER".
    pub reference_type: String,
    /// Identifier of the document within its kind.
    pub reference_id: String,
}

impl DocumentReference {
    /// Creates a new document reference.
    #[must_use]
    pub fn new(reference_type: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            reference_type: reference_type.into(),
            reference_id: reference_id.into(),
        }
    }
}

/// One requested leg of a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegRequest {
    /// The account to post to.
    pub account_id: AccountId,
    /// Whether this is a debit or credit entry.
    pub entry_type: EntryType,
    /// The amount in the leg currency (must be positive).
    pub amount: Decimal,
    /// The leg currency.
    pub currency: CurrencyCode,
    /// Multiplier converting the leg currency into base currency.
    pub exchange_rate: Decimal,
    /// Optional memo for this line.
    pub description: Option<String>,
}

impl LegRequest {
    /// A base-currency debit (exchange rate 1).
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal, currency: CurrencyCode) -> Self {
        Self::new(account_id, EntryType::Debit, amount, currency)
    }

    /// A base-currency credit (exchange rate 1).
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal, currency: CurrencyCode) -> Self {
        Self::new(account_id, EntryType::Credit, amount, currency)
    }

    fn new(
        account_id: AccountId,
        entry_type: EntryType,
        amount: Decimal,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            account_id,
            entry_type,
            amount,
            currency,
            exchange_rate: Decimal::ONE,
            description: None,
        }
    }

    /// Sets the exchange rate to base currency.
    #[must_use]
    pub fn with_rate(mut self, exchange_rate: Decimal) -> Self {
        self.exchange_rate = exchange_rate;
        self
    }
}

/// Input for posting a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostTransactionInput {
    /// The date of the transaction.
    pub transaction_date: NaiveDate,
    /// The type of transaction.
    pub transaction_type: TransactionType,
    /// Originating business document, if any.
    pub reference: Option<DocumentReference>,
    /// A description of the transaction.
    pub description: String,
    /// The legs (must have at least 2).
    pub legs: Vec<LegRequest>,
}

/// A validated leg with its base-currency amount computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLeg {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Amount in the leg currency.
    pub amount: Decimal,
    /// Leg currency.
    pub currency: CurrencyCode,
    /// Rate applied.
    pub exchange_rate: Decimal,
    /// `amount * exchange_rate`, unrounded.
    pub amount_in_base: Decimal,
    /// Optional memo.
    pub description: Option<String>,
}

/// Debit/credit subtotal for one leg currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotals {
    /// Debits in the leg currency.
    pub debit: Decimal,
    /// Credits in the leg currency.
    pub credit: Decimal,
}

/// Transaction totals for validation and display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTotals {
    /// Total debit amount in base currency.
    pub base_debit: Decimal,
    /// Total credit amount in base currency.
    pub base_credit: Decimal,
    /// Per leg-currency subtotals, in the leg currency.
    pub by_currency: BTreeMap<CurrencyCode, CurrencyTotals>,
}

impl TransactionTotals {
    /// Accumulates one leg, saturating at the decimal range.
    pub fn add(
        &mut self,
        entry_type: EntryType,
        currency: CurrencyCode,
        amount: Decimal,
        amount_in_base: Decimal,
    ) {
        let bucket = self.by_currency.entry(currency).or_default();
        match entry_type {
            EntryType::Debit => {
                self.base_debit = self.base_debit.saturating_add(amount_in_base);
                bucket.debit = bucket.debit.saturating_add(amount);
            }
            EntryType::Credit => {
                self.base_credit = self.base_credit.saturating_add(amount_in_base);
                bucket.credit = bucket.credit.saturating_add(amount);
            }
        }
    }

    /// Accumulates one leg, returning `None` and leaving the totals untouched
    /// if any sum would overflow.
    #[must_use]
    pub fn checked_add(
        &mut self,
        entry_type: EntryType,
        currency: CurrencyCode,
        amount: Decimal,
        amount_in_base: Decimal,
    ) -> Option<()> {
        let bucket = self.by_currency.get(&currency).copied().unwrap_or_default();
        let (base, bucket) = match entry_type {
            EntryType::Debit => (
                self.base_debit.checked_add(amount_in_base)?,
                CurrencyTotals { debit: bucket.debit.checked_add(amount)?, ..bucket },
            ),
            EntryType::Credit => (
                self.base_credit.checked_add(amount_in_base)?,
                CurrencyTotals { credit: bucket.credit.checked_add(amount)?, ..bucket },
            ),
        };
        match entry_type {
            EntryType::Debit => self.base_debit = base,
            EntryType::Credit => self.base_credit = base,
        }
        self.by_currency.insert(currency, bucket);
        Some(())
    }

    /// Returns debits minus credits in base currency.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.base_debit - self.base_credit
    }

    /// Returns true when the base-currency imbalance is within `tolerance`.
    #[must_use]
    pub fn is_balanced_within(&self, tolerance: Decimal) -> bool {
        self.difference().abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_status_editable() {
        assert!(TransactionStatus::Draft.is_editable());
        assert!(!TransactionStatus::Posted.is_editable());
        assert!(!TransactionStatus::Void.is_editable());
    }

    #[test]
    fn test_transaction_status_immutable() {
        assert!(!TransactionStatus::Draft.is_immutable());
        assert!(TransactionStatus::Posted.is_immutable());
        assert!(TransactionStatus::Void.is_immutable());
    }

    #[test]
    fn test_cash_native_types() {
        let cash: Vec<_> = TransactionType::ALL
            .into_iter()
            .filter(|t| t.is_cash_native())
            .collect();
        assert_eq!(
            cash,
            vec![
                TransactionType::Receipt,
                TransactionType::Payment,
                TransactionType::BankTransfer
            ]
        );
    }

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!(
            "bank_transfer".parse::<TransactionType>().unwrap(),
            TransactionType::BankTransfer
        );
        assert!("REFUND".parse::<TransactionType>().is_err());
        for t in TransactionType::ALL {
            assert_eq!(t.to_string().parse::<TransactionType>().unwrap(), t);
        }
    }

    #[test]
    fn test_totals_track_currency_and_base() {
        let mut totals = TransactionTotals::default();
        totals.add(EntryType::Debit, CurrencyCode::EUR, dec!(100), dec!(110));
        totals.add(EntryType::Credit, CurrencyCode::USD, dec!(110), dec!(110));

        assert!(totals.is_balanced_within(Decimal::ZERO));
        assert_eq!(totals.by_currency[&CurrencyCode::EUR].debit, dec!(100));
        assert_eq!(totals.by_currency[&CurrencyCode::USD].credit, dec!(110));
    }

    #[test]
    fn test_totals_tolerance() {
        let mut totals = TransactionTotals::default();
        totals.add(EntryType::Debit, CurrencyCode::USD, dec!(1), dec!(100.0000005));
        totals.add(EntryType::Credit, CurrencyCode::USD, dec!(1), dec!(100));

        assert!(totals.is_balanced_within(dec!(0.000001)));
        assert!(!totals.is_balanced_within(dec!(0.0000001)));
        assert_eq!(totals.difference(), dec!(0.0000005));
    }

    #[test]
    fn test_checked_add_stops_at_overflow() {
        let mut totals = TransactionTotals::default();
        assert!(totals.checked_add(EntryType::Debit, CurrencyCode::USD, Decimal::MAX, Decimal::MAX).is_some());
        assert!(totals.checked_add(EntryType::Debit, CurrencyCode::USD, dec!(1), dec!(1)).is_none());
        assert_eq!(totals.base_debit, Decimal::MAX);
        assert_eq!(totals.by_currency[&CurrencyCode::USD].debit, Decimal::MAX);

        assert!(totals.checked_add(EntryType::Credit, CurrencyCode::USD, dec!(1), dec!(1)).is_some());
        assert_eq!(totals.base_credit, dec!(1));
    }

    #[test]
    fn test_entry_type_opposite() {
        assert_eq!(EntryType::Debit.opposite(), EntryType::Credit);
        assert_eq!(EntryType::Credit.opposite(), EntryType::Debit);
    }
}
