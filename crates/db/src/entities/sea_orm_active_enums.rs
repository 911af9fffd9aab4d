//! `SeaORM` active enums mirroring the Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    #[sea_orm(string_value = "ASSET")]
    Asset,
    #[sea_orm(string_value = "LIABILITY")]
    Liability,
    #[sea_orm(string_value = "EQUITY")]
    Equity,
    #[sea_orm(string_value = "REVENUE")]
    Revenue,
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    #[sea_orm(string_value = "COST_OF_SALES")]
    CostOfSales,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_subtype")]
pub enum AccountSubtype {
    #[sea_orm(string_value = "CASH")]
    Cash,
    #[sea_orm(string_value = "BANK")]
    Bank,
    #[sea_orm(string_value = "ACCOUNTS_RECEIVABLE")]
    AccountsReceivable,
    #[sea_orm(string_value = "INVENTORY")]
    Inventory,
    #[sea_orm(string_value = "CURRENT_ASSET")]
    CurrentAsset,
    #[sea_orm(string_value = "FIXED_ASSET")]
    FixedAsset,
    #[sea_orm(string_value = "OTHER_ASSET")]
    OtherAsset,
    #[sea_orm(string_value = "ACCOUNTS_PAYABLE")]
    AccountsPayable,
    #[sea_orm(string_value = "TAX_PAYABLE")]
    TaxPayable,
    #[sea_orm(string_value = "CURRENT_LIABILITY")]
    CurrentLiability,
    #[sea_orm(string_value = "LONG_TERM_LIABILITY")]
    LongTermLiability,
    #[sea_orm(string_value = "SHARE_CAPITAL")]
    ShareCapital,
    #[sea_orm(string_value = "RETAINED_EARNINGS")]
    RetainedEarnings,
    #[sea_orm(string_value = "OTHER_EQUITY")]
    OtherEquity,
    #[sea_orm(string_value = "OPERATING_REVENUE")]
    OperatingRevenue,
    #[sea_orm(string_value = "OTHER_INCOME")]
    OtherIncome,
    #[sea_orm(string_value = "COST_OF_GOODS_SOLD")]
    CostOfGoodsSold,
    #[sea_orm(string_value = "OPERATING_EXPENSE")]
    OperatingExpense,
    #[sea_orm(string_value = "OTHER_EXPENSE")]
    OtherExpense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_kind")]
pub enum AccountKind {
    #[sea_orm(string_value = "REVENUE")]
    Revenue,
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    #[sea_orm(string_value = "COST_OF_GOODS_SOLD")]
    CostOfGoodsSold,
    #[sea_orm(string_value = "TAX_PAYABLE")]
    TaxPayable,
    #[sea_orm(string_value = "INVENTORY_ASSET")]
    InventoryAsset,
    #[sea_orm(string_value = "ACCOUNTS_RECEIVABLE")]
    AccountsReceivable,
    #[sea_orm(string_value = "ACCOUNTS_PAYABLE")]
    AccountsPayable,
    #[sea_orm(string_value = "CASH")]
    Cash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
pub enum TransactionType {
    #[sea_orm(string_value = "SALE")]
    Sale,
    #[sea_orm(string_value = "BILL")]
    Bill,
    #[sea_orm(string_value = "RECEIPT")]
    Receipt,
    #[sea_orm(string_value = "PAYMENT")]
    Payment,
    #[sea_orm(string_value = "BANK_TRANSFER")]
    BankTransfer,
    #[sea_orm(string_value = "REVERSAL")]
    Reversal,
    #[sea_orm(string_value = "JOURNAL")]
    Journal,
    #[sea_orm(string_value = "ADJUSTMENT")]
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    #[sea_orm(string_value = "DRAFT")]
    Draft,
    #[sea_orm(string_value = "POSTED")]
    Posted,
    #[sea_orm(string_value = "VOID")]
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_type")]
pub enum EntryType {
    #[sea_orm(string_value = "DEBIT")]
    Debit,
    #[sea_orm(string_value = "CREDIT")]
    Credit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "movement_type")]
pub enum MovementType {
    #[sea_orm(string_value = "SALE")]
    Sale,
    #[sea_orm(string_value = "RETURN")]
    Return,
    #[sea_orm(string_value = "ADJUSTMENT")]
    Adjustment,
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
    #[sea_orm(string_value = "RECEIPT")]
    Receipt,
}
