//! Ledger error types for posting, reversal, and chart configuration.
//!
//! This module defines all errors that can occur during ledger operations,
//! including validation errors, account errors, transaction state errors,
//! and failures bubbling up from tax, inventory, and storage.

use rust_decimal::Decimal;
use tally_shared::AppError;
use tally_shared::types::{AccountId, CurrencyCode, ProductId, TransactionId};
use thiserror::Error;

use super::types::TransactionStatus;
use crate::accounts::{AccountKind, AccountSubtype, AccountType};
use crate::inventory::InventoryError;
use crate::store::StoreError;
use crate::tax::TaxError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction must have at least 2 legs.
    #[error("Transaction must have at least 2 legs, got {0}")]
    InsufficientLegs(usize),

    /// Transaction is not balanced in base currency.
    #[error(
        "Transaction is not balanced. Debit: {debit}, Credit: {credit}, Imbalance: {imbalance}"
    )]
    UnbalancedTransaction {
        /// Total debit amount in base currency.
        debit: Decimal,
        /// Total credit amount in base currency.
        credit: Decimal,
        /// Debit minus credit.
        imbalance: Decimal,
    },

    /// Leg amount must be strictly positive.
    #[error("Leg {index} amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// Zero-based leg position.
        index: usize,
        /// The offending amount.
        amount: Decimal,
    },

    /// Exchange rate must be strictly positive.
    #[error("Leg {index} exchange rate must be positive, got {rate}")]
    InvalidExchangeRate {
        /// Zero-based leg position.
        index: usize,
        /// The offending rate.
        rate: Decimal,
    },

    /// Leg amounts exceed the representable decimal range.
    #[error("Leg {index} amount overflows the decimal range")]
    AmountOverflow {
        /// Zero-based leg position.
        index: usize,
    },

    /// Transfers between accounts in different currencies need an FX leg.
    #[error("Cross-currency transfer from {from} to {to} is not supported; post it as two linked transactions")]
    CrossCurrencyTransfer {
        /// Source account currency.
        from: CurrencyCode,
        /// Destination account currency.
        to: CurrencyCode,
    },

    /// Document produced no postable amounts.
    #[error("Document has no postable amounts")]
    EmptyDocument,

    // ========== Account Errors ==========
    /// Account not found in this organization.
    #[error("Unknown account: {0}")]
    UnknownAccount(AccountId),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    InactiveAccount(AccountId),

    /// No account could be resolved for a posting role.
    #[error("No default account configured for {kind}")]
    NoDefaultAccountConfigured {
        /// The role being resolved.
        kind: AccountKind,
    },

    /// Subtype does not belong to the account type's family.
    #[error("Subtype {subtype} is not valid for {account_type} accounts")]
    SubtypeMismatch {
        /// The account type.
        account_type: AccountType,
        /// The rejected subtype.
        subtype: AccountSubtype,
    },

    /// Account type cannot fill the posting role.
    #[error("A {account_type} account cannot be the default for {kind}")]
    KindTypeMismatch {
        /// The posting role.
        kind: AccountKind,
        /// The rejected account's type.
        account_type: AccountType,
    },

    /// Account code already used in this organization.
    #[error("Account code {0} already exists")]
    DuplicateAccountCode(String),

    /// Account type cannot be changed because it has ledger entries.
    #[error("Cannot change account type for account {0} because it has ledger entries")]
    AccountTypeLocked(AccountId),

    /// Parent account does not exist or would create a cycle.
    #[error("Invalid parent account {0}")]
    InvalidParent(AccountId),

    // ========== Transaction State Errors ==========
    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Transaction has already been reversed.
    #[error("Transaction {0} has already been reversed")]
    AlreadyReversed(TransactionId),

    /// Reversals cannot themselves be reversed.
    #[error("Transaction {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(TransactionId),

    /// Operation requires a posted transaction.
    #[error("Transaction {id} is {status:?}, expected POSTED")]
    NotPosted {
        /// The transaction.
        id: TransactionId,
        /// Its current status.
        status: TransactionStatus,
    },

    /// Operation requires a draft transaction.
    #[error("Can only change draft transactions")]
    CanOnlyChangeDraft,

    /// A non-reversal posting already exists for this document.
    #[error("Document {reference_type}/{reference_id} has already been posted")]
    DuplicatePosting {
        /// Document kind.
        reference_type: String,
        /// Document id.
        reference_id: String,
    },

    /// Not enough stock and the document does not allow backorders.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product short.
        product_id: ProductId,
        /// Units on the document.
        requested: Decimal,
        /// Units available.
        available: Decimal,
    },

    // ========== Collaborator Errors ==========
    /// Tax calculation failed.
    #[error(transparent)]
    Tax(#[from] TaxError),

    /// Inventory valuation failed.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLegs(_) => "INSUFFICIENT_LEGS",
            Self::UnbalancedTransaction { .. } => "UNBALANCED_TRANSACTION",
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::InvalidExchangeRate { .. } => "INVALID_EXCHANGE_RATE",
            Self::AmountOverflow { .. } => "AMOUNT_OVERFLOW",
            Self::CrossCurrencyTransfer { .. } => "CROSS_CURRENCY_TRANSFER",
            Self::EmptyDocument => "EMPTY_DOCUMENT",
            Self::UnknownAccount(_) => "UNKNOWN_ACCOUNT",
            Self::InactiveAccount(_) => "INACTIVE_ACCOUNT",
            Self::NoDefaultAccountConfigured { .. } => "NO_DEFAULT_ACCOUNT_CONFIGURED",
            Self::SubtypeMismatch { .. } => "SUBTYPE_MISMATCH",
            Self::KindTypeMismatch { .. } => "KIND_TYPE_MISMATCH",
            Self::DuplicateAccountCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::AccountTypeLocked(_) => "ACCOUNT_TYPE_LOCKED",
            Self::InvalidParent(_) => "INVALID_PARENT",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::NotPosted { .. } => "NOT_POSTED",
            Self::CanOnlyChangeDraft => "CAN_ONLY_CHANGE_DRAFT",
            Self::DuplicatePosting { .. } => "DUPLICATE_POSTING",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::Tax(e) => e.error_code(),
            Self::Inventory(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InsufficientLegs(_)
            | Self::UnbalancedTransaction { .. }
            | Self::NonPositiveAmount { .. }
            | Self::InvalidExchangeRate { .. }
            | Self::AmountOverflow { .. }
            | Self::CrossCurrencyTransfer { .. }
            | Self::EmptyDocument
            | Self::InactiveAccount(_)
            | Self::SubtypeMismatch { .. }
            | Self::KindTypeMismatch { .. }
            | Self::InvalidParent(_)
            | Self::Tax(_) => 400,

            // 404 Not Found
            Self::UnknownAccount(_) | Self::TransactionNotFound(_) => 404,

            // 409 Conflict - state and uniqueness errors
            Self::AlreadyReversed(_)
            | Self::DuplicateAccountCode(_)
            | Self::DuplicatePosting { .. } => 409,

            // 422 Unprocessable - configuration or lifecycle problems
            Self::NoDefaultAccountConfigured { .. }
            | Self::AccountTypeLocked(_)
            | Self::CannotReverseReversal(_)
            | Self::NotPosted { .. }
            | Self::CanOnlyChangeDraft
            | Self::InsufficientStock { .. } => 422,

            Self::Inventory(e) => e.http_status_code(),
            Self::Store(e) => e.http_status_code(),
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Inventory(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::from_status(err.http_status_code(), err.to_string())
    }
}
