//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Ledger entries and transaction aggregates
//! - Balance calculations and sign conventions
//! - Posting validation (leg count, amounts, rates, balance)
//! - Reversals
//! - The posting engine that ties validation to storage

pub mod balance;
pub mod engine;
pub mod entry;
pub mod error;
pub mod reversal;
pub mod service;
pub mod transaction;
pub mod types;

#[cfg(test)]
mod reversal_props;
#[cfg(test)]
mod service_props;

pub use balance::{AccountBalance, NormalBalance};
pub use engine::PostingEngine;
pub use entry::LedgerEntry;
pub use error::LedgerError;
pub use reversal::ReversalService;
pub use service::{AccountInfo, LedgerService};
pub use transaction::{Transaction, TransactionHeader};
pub use types::{
    CurrencyTotals, DocumentReference, EntryType, LegRequest, PostTransactionInput, ResolvedLeg,
    TransactionStatus, TransactionTotals, TransactionType,
};
