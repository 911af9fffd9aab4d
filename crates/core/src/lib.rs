//! Core business logic for Tally.
//!
//! This crate holds the posting and reporting rules with no web or database
//! dependencies. Persistence goes through the [`store`] port.
//!
//! # Modules
//!
//! - `ledger` - Double-entry posting, drafts and reversals
//! - `accounts` - Chart of accounts, subtypes and default-account resolution
//! - `posting` - Business documents turned into balanced postings
//! - `inventory` - Weighted-average stock valuation
//! - `tax` - Line tax and discount arithmetic
//! - `reports` - Trial balance, profit & loss and balance sheet
//! - `fiscal` - Reporting periods and fiscal-year boundaries
//! - `store` - Unit-of-work storage port and in-memory store

pub mod accounts;
pub mod fiscal;
pub mod inventory;
pub mod ledger;
pub mod posting;
pub mod reports;
pub mod store;
pub mod tax;

#[cfg(test)]
mod test_support;
