//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::default_accounts::Entity as DefaultAccounts;
pub use super::inventory_items::Entity as InventoryItems;
pub use super::ledger_entries::Entity as LedgerEntries;
pub use super::stock_movements::Entity as StockMovements;
pub use super::transaction_reversals::Entity as TransactionReversals;
pub use super::transaction_sequences::Entity as TransactionSequences;
pub use super::transactions::Entity as Transactions;
