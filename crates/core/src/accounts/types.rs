//! Chart of accounts domain types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, OrganizationId};

use crate::ledger::balance::NormalBalance;

/// Top-level classification of a ledger account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Resources owned.
    Asset,
    /// Obligations owed.
    Liability,
    /// Owners' residual interest.
    Equity,
    /// Income earned.
    Revenue,
    /// Costs incurred.
    Expense,
    /// Direct cost of goods sold, kept separate from operating expenses.
    CostOfSales,
}

impl AccountType {
    /// All account types.
    pub const ALL: [Self; 6] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Revenue,
        Self::Expense,
        Self::CostOfSales,
    ];

    /// The direction in which this account type naturally grows.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense | Self::CostOfSales => NormalBalance::DebitNormal,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::CreditNormal,
        }
    }

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "ASSET",
            Self::Liability => "LIABILITY",
            Self::Equity => "EQUITY",
            Self::Revenue => "REVENUE",
            Self::Expense => "EXPENSE",
            Self::CostOfSales => "COST_OF_SALES",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown account type: {s}"))
    }
}

/// Closed set of account sub-classifications used for report bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountSubtype {
    // Assets
    /// Cash on hand.
    Cash,
    /// Bank accounts.
    Bank,
    /// Amounts owed by customers.
    AccountsReceivable,
    /// Stock held for sale.
    Inventory,
    /// Any other current asset.
    CurrentAsset,
    /// Property, plant and equipment.
    FixedAsset,
    /// Long-lived non-fixed assets.
    OtherAsset,
    // Liabilities
    /// Amounts owed to vendors.
    AccountsPayable,
    /// Sales tax / VAT collected and recoverable.
    TaxPayable,
    /// Any other current liability.
    CurrentLiability,
    /// Obligations due after one year.
    LongTermLiability,
    // Equity
    /// Contributed capital.
    ShareCapital,
    /// Accumulated prior-year earnings.
    RetainedEarnings,
    /// Any other equity.
    OtherEquity,
    // Revenue
    /// Primary operating revenue.
    OperatingRevenue,
    /// Non-operating income (interest, gains).
    OtherIncome,
    // Expenses
    /// Direct cost of goods sold.
    CostOfGoodsSold,
    /// Operating expenses.
    OperatingExpense,
    /// Non-operating expenses (interest, losses).
    OtherExpense,
}

impl AccountSubtype {
    /// All subtypes.
    pub const ALL: [Self; 19] = [
        Self::Cash,
        Self::Bank,
        Self::AccountsReceivable,
        Self::Inventory,
        Self::CurrentAsset,
        Self::FixedAsset,
        Self::OtherAsset,
        Self::AccountsPayable,
        Self::TaxPayable,
        Self::CurrentLiability,
        Self::LongTermLiability,
        Self::ShareCapital,
        Self::RetainedEarnings,
        Self::OtherEquity,
        Self::OperatingRevenue,
        Self::OtherIncome,
        Self::CostOfGoodsSold,
        Self::OperatingExpense,
        Self::OtherExpense,
    ];

    /// Database/wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Bank => "BANK",
            Self::AccountsReceivable => "ACCOUNTS_RECEIVABLE",
            Self::Inventory => "INVENTORY",
            Self::CurrentAsset => "CURRENT_ASSET",
            Self::FixedAsset => "FIXED_ASSET",
            Self::OtherAsset => "OTHER_ASSET",
            Self::AccountsPayable => "ACCOUNTS_PAYABLE",
            Self::TaxPayable => "TAX_PAYABLE",
            Self::CurrentLiability => "CURRENT_LIABILITY",
            Self::LongTermLiability => "LONG_TERM_LIABILITY",
            Self::ShareCapital => "SHARE_CAPITAL",
            Self::RetainedEarnings => "RETAINED_EARNINGS",
            Self::OtherEquity => "OTHER_EQUITY",
            Self::OperatingRevenue => "OPERATING_REVENUE",
            Self::OtherIncome => "OTHER_INCOME",
            Self::CostOfGoodsSold => "COST_OF_GOODS_SOLD",
            Self::OperatingExpense => "OPERATING_EXPENSE",
            Self::OtherExpense => "OTHER_EXPENSE",
        }
    }
}

impl fmt::Display for AccountSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses canonical names as well as the spaced, mixed-case labels found in
/// imported charts ("Cost of Goods Sold", "fixed-asset").
impl FromStr for AccountSubtype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        let canonical = match normalized.as_str() {
            "COGS" => "COST_OF_GOODS_SOLD",
            "AR" => "ACCOUNTS_RECEIVABLE",
            "AP" => "ACCOUNTS_PAYABLE",
            "VAT_PAYABLE" | "SALES_TAX_PAYABLE" => "TAX_PAYABLE",
            "REVENUE" | "SALES" => "OPERATING_REVENUE",
            "EXPENSE" => "OPERATING_EXPENSE",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == canonical)
            .ok_or_else(|| format!("Unknown account subtype: {s}"))
    }
}

/// A chart of accounts entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Account code, unique per organization and used as the sort key.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Top-level classification. Immutable once entries reference the account.
    pub account_type: AccountType,
    /// Optional sub-classification for report bucketing.
    pub account_subtype: Option<AccountSubtype>,
    /// Parent account for hierarchical reports.
    pub parent_id: Option<AccountId>,
    /// Inactive accounts reject new postings.
    pub is_active: bool,
}

impl Account {
    /// Returns true if this equity account carries retained earnings.
    ///
    /// Matches the explicit subtype, or falls back to the account name for
    /// charts imported without subtypes.
    #[must_use]
    pub fn is_retained_earnings(&self) -> bool {
        if self.account_type != AccountType::Equity {
            return false;
        }
        if self.account_subtype == Some(AccountSubtype::RetainedEarnings) {
            return true;
        }
        let name = self.name.to_lowercase();
        name.contains("retained") || name.contains("earnings")
    }
}
