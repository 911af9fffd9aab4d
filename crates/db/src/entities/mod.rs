//! `SeaORM` entities for the ledger schema.

pub mod prelude;

pub mod accounts;
pub mod default_accounts;
pub mod inventory_items;
pub mod ledger_entries;
pub mod sea_orm_active_enums;
pub mod stock_movements;
pub mod transaction_reversals;
pub mod transaction_sequences;
pub mod transactions;
