//! Versioned mapping from account subtypes to report buckets.
//!
//! The table is validated when accounts are configured, so report generation
//! never has to guess where an account belongs.

use serde::{Deserialize, Serialize};

use super::types::{AccountSubtype, AccountType};
use crate::ledger::LedgerError;

/// Version of [`SUBTYPE_BUCKETS`]. Bump whenever a row changes so stored
/// reports can record which mapping produced them.
pub const SUBTYPE_MAPPING_VERSION: u32 = 1;

/// Section of a financial statement an account reports under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportBucket {
    /// Balance sheet: current assets.
    CurrentAssets,
    /// Balance sheet: fixed assets.
    FixedAssets,
    /// Balance sheet: other assets.
    OtherAssets,
    /// Balance sheet: current liabilities.
    CurrentLiabilities,
    /// Balance sheet: long-term liabilities.
    LongTermLiabilities,
    /// Balance sheet: retained earnings.
    RetainedEarnings,
    /// Balance sheet: other equity.
    OtherEquity,
    /// P&L: operating revenue.
    Revenue,
    /// P&L: non-operating income.
    OtherIncome,
    /// P&L: cost of goods sold.
    CostOfGoodsSold,
    /// P&L: operating expenses.
    OperatingExpenses,
    /// P&L: non-operating expenses.
    OtherExpenses,
}

/// Subtype rows: (subtype, owning account types, bucket).
pub const SUBTYPE_BUCKETS: &[(AccountSubtype, &[AccountType], ReportBucket)] = &[
    (AccountSubtype::Cash, &[AccountType::Asset], ReportBucket::CurrentAssets),
    (AccountSubtype::Bank, &[AccountType::Asset], ReportBucket::CurrentAssets),
    (AccountSubtype::AccountsReceivable, &[AccountType::Asset], ReportBucket::CurrentAssets),
    (AccountSubtype::Inventory, &[AccountType::Asset], ReportBucket::CurrentAssets),
    (AccountSubtype::CurrentAsset, &[AccountType::Asset], ReportBucket::CurrentAssets),
    (AccountSubtype::FixedAsset, &[AccountType::Asset], ReportBucket::FixedAssets),
    (AccountSubtype::OtherAsset, &[AccountType::Asset], ReportBucket::OtherAssets),
    (AccountSubtype::AccountsPayable, &[AccountType::Liability], ReportBucket::CurrentLiabilities),
    (AccountSubtype::TaxPayable, &[AccountType::Liability], ReportBucket::CurrentLiabilities),
    (AccountSubtype::CurrentLiability, &[AccountType::Liability], ReportBucket::CurrentLiabilities),
    (AccountSubtype::LongTermLiability, &[AccountType::Liability], ReportBucket::LongTermLiabilities),
    (AccountSubtype::ShareCapital, &[AccountType::Equity], ReportBucket::OtherEquity),
    (AccountSubtype::RetainedEarnings, &[AccountType::Equity], ReportBucket::RetainedEarnings),
    (AccountSubtype::OtherEquity, &[AccountType::Equity], ReportBucket::OtherEquity),
    (AccountSubtype::OperatingRevenue, &[AccountType::Revenue], ReportBucket::Revenue),
    (AccountSubtype::OtherIncome, &[AccountType::Revenue], ReportBucket::OtherIncome),
    (
        AccountSubtype::CostOfGoodsSold,
        &[AccountType::Expense, AccountType::CostOfSales],
        ReportBucket::CostOfGoodsSold,
    ),
    (AccountSubtype::OperatingExpense, &[AccountType::Expense], ReportBucket::OperatingExpenses),
    (AccountSubtype::OtherExpense, &[AccountType::Expense], ReportBucket::OtherExpenses),
];

fn row(subtype: AccountSubtype) -> Option<&'static (AccountSubtype, &'static [AccountType], ReportBucket)> {
    SUBTYPE_BUCKETS.iter().find(|(s, _, _)| *s == subtype)
}

/// Checks that `subtype` is allowed on an account of `account_type`.
///
/// # Errors
///
/// Returns `SubtypeMismatch` when the subtype belongs to another family.
pub fn validate_subtype(
    account_type: AccountType,
    subtype: Option<AccountSubtype>,
) -> Result<(), LedgerError> {
    let Some(subtype) = subtype else {
        return Ok(());
    };
    match row(subtype) {
        Some((_, types, _)) if types.contains(&account_type) => Ok(()),
        _ => Err(LedgerError::SubtypeMismatch {
            account_type,
            subtype,
        }),
    }
}

/// Returns the report bucket for an account.
///
/// COST_OF_SALES accounts always land in cost of goods sold. Accounts
/// without a subtype take the type's default bucket, which for assets and
/// liabilities is the current section.
#[must_use]
pub fn bucket_for(account_type: AccountType, subtype: Option<AccountSubtype>) -> ReportBucket {
    if account_type == AccountType::CostOfSales {
        return ReportBucket::CostOfGoodsSold;
    }
    if let Some((_, types, bucket)) = subtype.and_then(row) {
        if types.contains(&account_type) {
            return *bucket;
        }
    }
    match account_type {
        AccountType::Asset => ReportBucket::CurrentAssets,
        AccountType::Liability => ReportBucket::CurrentLiabilities,
        AccountType::Equity => ReportBucket::OtherEquity,
        AccountType::Revenue => ReportBucket::Revenue,
        AccountType::Expense => ReportBucket::OperatingExpenses,
        AccountType::CostOfSales => ReportBucket::CostOfGoodsSold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_subtype_has_exactly_one_row() {
        for subtype in AccountSubtype::ALL {
            let rows = SUBTYPE_BUCKETS.iter().filter(|(s, _, _)| *s == subtype).count();
            assert_eq!(rows, 1, "{subtype} should appear exactly once");
        }
    }

    #[test]
    fn test_validate_subtype_family() {
        assert!(validate_subtype(AccountType::Asset, Some(AccountSubtype::FixedAsset)).is_ok());
        assert!(validate_subtype(AccountType::Asset, None).is_ok());
        assert!(validate_subtype(AccountType::CostOfSales, Some(AccountSubtype::CostOfGoodsSold)).is_ok());
        assert!(matches!(
            validate_subtype(AccountType::Revenue, Some(AccountSubtype::FixedAsset)),
            Err(LedgerError::SubtypeMismatch { .. })
        ));
        assert!(validate_subtype(AccountType::CostOfSales, Some(AccountSubtype::OperatingExpense)).is_err());
    }

    #[test]
    fn test_cost_of_sales_type_always_cogs() {
        assert_eq!(bucket_for(AccountType::CostOfSales, None), ReportBucket::CostOfGoodsSold);
        assert_eq!(
            bucket_for(AccountType::CostOfSales, Some(AccountSubtype::OtherExpense)),
            ReportBucket::CostOfGoodsSold
        );
    }

    #[test]
    fn test_unclassified_defaults_to_current() {
        assert_eq!(bucket_for(AccountType::Asset, None), ReportBucket::CurrentAssets);
        assert_eq!(bucket_for(AccountType::Liability, None), ReportBucket::CurrentLiabilities);
        assert_eq!(bucket_for(AccountType::Expense, None), ReportBucket::OperatingExpenses);
    }

    #[test]
    fn test_expense_buckets_are_exclusive() {
        let expense_buckets: Vec<_> = [
            Some(AccountSubtype::CostOfGoodsSold),
            Some(AccountSubtype::OperatingExpense),
            Some(AccountSubtype::OtherExpense),
            None,
        ]
        .into_iter()
        .map(|s| bucket_for(AccountType::Expense, s))
        .collect();
        assert_eq!(
            expense_buckets,
            vec![
                ReportBucket::CostOfGoodsSold,
                ReportBucket::OperatingExpenses,
                ReportBucket::OtherExpenses,
                ReportBucket::OperatingExpenses,
            ]
        );
    }

    #[test]
    fn test_mismatched_subtype_falls_back_to_type_default() {
        assert_eq!(
            bucket_for(AccountType::Liability, Some(AccountSubtype::FixedAsset)),
            ReportBucket::CurrentLiabilities
        );
    }
}
