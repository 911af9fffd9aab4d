//! Report data types.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tally_shared::config::DefaultBasis;
use tally_shared::types::AccountId;

use super::error::ReportError;
use crate::accounts::{AccountSubtype, AccountType};

/// Which transactions count towards a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportBasis {
    /// Every posted transaction.
    #[default]
    Accrual,
    /// Cash movements, plus documents settled within the window.
    Cash,
}

impl From<DefaultBasis> for ReportBasis {
    fn from(basis: DefaultBasis) -> Self {
        match basis {
            DefaultBasis::Accrual => Self::Accrual,
            DefaultBasis::Cash => Self::Cash,
        }
    }
}

/// One account's activity in a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceEntry {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub account_code: String,
    /// Account name.
    pub account_name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Account subtype.
    pub account_subtype: Option<AccountSubtype>,
    /// Parent account.
    pub parent_id: Option<AccountId>,
    /// Sum of debits in base currency.
    pub debit_total: Decimal,
    /// Sum of credits in base currency.
    pub credit_total: Decimal,
    /// Balance in the account's normal direction.
    pub balance: Decimal,
}

/// Trial balance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// First day covered.
    pub start: NaiveDate,
    /// Last day covered.
    pub end: NaiveDate,
    /// Basis used.
    pub basis: ReportBasis,
    /// Accounts with activity, ordered by code.
    pub entries: Vec<TrialBalanceEntry>,
    /// Totals.
    pub totals: TrialBalanceTotals,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Total debit.
    pub total_debit: Decimal,
    /// Total credit.
    pub total_credit: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

impl TrialBalanceTotals {
    /// Sums entries.
    #[must_use]
    pub fn of(entries: &[TrialBalanceEntry]) -> Self {
        let total_debit: Decimal = entries.iter().map(|e| e.debit_total).sum();
        let total_credit: Decimal = entries.iter().map(|e| e.credit_total).sum();
        Self {
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }
}

/// One account line inside a report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Balance in the account's normal direction.
    pub amount: Decimal,
}

/// A named group of account lines with an optional level of children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    /// Section name.
    pub name: String,
    /// Lines directly in this section.
    pub accounts: Vec<ReportLine>,
    /// Sum of `accounts` and every child's subtotal.
    pub subtotal: Decimal,
    /// Sub-groups, one per parent account.
    pub children: Vec<ReportSection>,
}

impl ReportSection {
    /// Creates an empty section.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns true when nothing is in the section.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.children.is_empty()
    }
}

/// Current versus prior period for one figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonLine {
    /// This period.
    pub current: Decimal,
    /// Preceding period.
    pub prior: Decimal,
    /// `current - prior`.
    pub variance: Decimal,
    /// `variance / |prior| * 100`, two places; zero when prior is zero.
    pub variance_percent: Decimal,
}

impl ComparisonLine {
    /// Compares two figures.
    #[must_use]
    pub fn new(current: Decimal, prior: Decimal) -> Self {
        let variance = current - prior;
        let variance_percent = if prior.is_zero() {
            Decimal::ZERO
        } else {
            (variance / prior.abs() * Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
        };
        Self {
            current,
            prior,
            variance,
            variance_percent,
        }
    }
}

/// Headline P&L figures for one period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLossTotals {
    /// Operating revenue.
    pub revenue: Decimal,
    /// Non-operating income.
    pub other_income: Decimal,
    /// Cost of goods sold.
    pub cost_of_goods_sold: Decimal,
    /// Operating expenses.
    pub operating_expenses: Decimal,
    /// Non-operating expenses.
    pub other_expenses: Decimal,
}

impl ProfitLossTotals {
    /// Revenue minus cost of goods sold.
    #[must_use]
    pub fn gross_profit(&self) -> Decimal {
        self.revenue - self.cost_of_goods_sold
    }

    /// Gross profit minus operating expenses.
    #[must_use]
    pub fn operating_income(&self) -> Decimal {
        self.gross_profit() - self.operating_expenses
    }

    /// Operating income plus other income minus other expenses.
    #[must_use]
    pub fn net_income(&self) -> Decimal {
        self.operating_income() + self.other_income - self.other_expenses
    }
}

/// Per-bucket comparison with the preceding period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLossComparison {
    /// First day of the prior period.
    pub prior_start: NaiveDate,
    /// Last day of the prior period.
    pub prior_end: NaiveDate,
    /// Operating revenue.
    pub revenue: ComparisonLine,
    /// Non-operating income.
    pub other_income: ComparisonLine,
    /// Cost of goods sold.
    pub cost_of_goods_sold: ComparisonLine,
    /// Gross profit.
    pub gross_profit: ComparisonLine,
    /// Operating expenses.
    pub operating_expenses: ComparisonLine,
    /// Operating income.
    pub operating_income: ComparisonLine,
    /// Non-operating expenses.
    pub other_expenses: ComparisonLine,
    /// Net income.
    pub net_income: ComparisonLine,
}

impl ProfitLossComparison {
    /// Builds the comparison from two periods' totals.
    #[must_use]
    pub fn between(
        current: &ProfitLossTotals,
        prior: &ProfitLossTotals,
        prior_start: NaiveDate,
        prior_end: NaiveDate,
    ) -> Self {
        Self {
            prior_start,
            prior_end,
            revenue: ComparisonLine::new(current.revenue, prior.revenue),
            other_income: ComparisonLine::new(current.other_income, prior.other_income),
            cost_of_goods_sold: ComparisonLine::new(current.cost_of_goods_sold, prior.cost_of_goods_sold),
            gross_profit: ComparisonLine::new(current.gross_profit(), prior.gross_profit()),
            operating_expenses: ComparisonLine::new(current.operating_expenses, prior.operating_expenses),
            operating_income: ComparisonLine::new(current.operating_income(), prior.operating_income()),
            other_expenses: ComparisonLine::new(current.other_expenses, prior.other_expenses),
            net_income: ComparisonLine::new(current.net_income(), prior.net_income()),
        }
    }
}

/// Profit and loss statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitLossReport {
    /// First day covered.
    pub start: NaiveDate,
    /// Last day covered.
    pub end: NaiveDate,
    /// Basis used.
    pub basis: ReportBasis,
    /// Subtype mapping version that placed accounts into sections.
    pub mapping_version: u32,
    /// Operating revenue.
    pub revenue: ReportSection,
    /// Non-operating income.
    pub other_income: ReportSection,
    /// Cost of goods sold.
    pub cost_of_goods_sold: ReportSection,
    /// Operating expenses.
    pub operating_expenses: ReportSection,
    /// Non-operating expenses.
    pub other_expenses: ReportSection,
    /// Revenue minus cost of goods sold.
    pub gross_profit: Decimal,
    /// Gross profit minus operating expenses.
    pub operating_income: Decimal,
    /// Bottom line.
    pub net_income: Decimal,
    /// Preceding period, when requested.
    pub comparison: Option<ProfitLossComparison>,
}

impl ProfitLossReport {
    /// Section subtotals as headline figures.
    #[must_use]
    pub fn totals(&self) -> ProfitLossTotals {
        ProfitLossTotals {
            revenue: self.revenue.subtotal,
            other_income: self.other_income.subtotal,
            cost_of_goods_sold: self.cost_of_goods_sold.subtotal,
            operating_expenses: self.operating_expenses.subtotal,
            other_expenses: self.other_expenses.subtotal,
        }
    }
}

/// Balance sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetReport {
    /// Balances are cumulative through this date.
    pub as_of: NaiveDate,
    /// Basis used.
    pub basis: ReportBasis,
    /// Subtype mapping version that placed accounts into sections.
    pub mapping_version: u32,
    /// Start of the fiscal year containing `as_of`.
    pub fiscal_year_start: NaiveDate,
    /// Current assets.
    pub current_assets: ReportSection,
    /// Fixed assets.
    pub fixed_assets: ReportSection,
    /// Other assets.
    pub other_assets: ReportSection,
    /// All assets.
    pub total_assets: Decimal,
    /// Current liabilities.
    pub current_liabilities: ReportSection,
    /// Long-term liabilities.
    pub long_term_liabilities: ReportSection,
    /// All liabilities.
    pub total_liabilities: Decimal,
    /// Equity other than retained earnings.
    pub equity: ReportSection,
    /// Net income before the fiscal year plus retained-earnings accounts.
    pub retained_earnings: Decimal,
    /// Net income from the fiscal year start through `as_of`.
    pub current_year_earnings: Decimal,
    /// Equity section plus both earnings lines.
    pub total_equity: Decimal,
    /// Liabilities plus equity.
    pub total_liabilities_and_equity: Decimal,
}

impl BalanceSheetReport {
    /// Assets minus liabilities and equity.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_assets - self.total_liabilities_and_equity
    }

    /// Checks that assets equal liabilities plus equity. Never adjusts.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBalance` when the difference exceeds `tolerance`.
    pub fn verify(&self, tolerance: Decimal) -> Result<(), ReportError> {
        let difference = self.difference();
        if difference.abs() > tolerance {
            return Err(ReportError::OutOfBalance { difference });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(120), dec!(100), dec!(20), dec!(20.00))]
    #[case(dec!(50), dec!(200), dec!(-150), dec!(-75.00))]
    #[case(dec!(10), dec!(-40), dec!(50), dec!(125.00))]
    #[case(dec!(2), dec!(3), dec!(-1), dec!(-33.33))]
    #[case(dec!(500), dec!(0), dec!(500), dec!(0))]
    fn test_comparison_line(
        #[case] current: Decimal,
        #[case] prior: Decimal,
        #[case] variance: Decimal,
        #[case] percent: Decimal,
    ) {
        let line = ComparisonLine::new(current, prior);
        assert_eq!(line.variance, variance);
        assert_eq!(line.variance_percent, percent);
    }

    #[test]
    fn test_basis_wire_format() {
        assert_eq!(serde_json::to_string(&ReportBasis::Cash).unwrap(), "\"CASH\"");
        assert_eq!(ReportBasis::from(DefaultBasis::Cash), ReportBasis::Cash);
    }

    #[test]
    fn test_derived_totals() {
        let totals = ProfitLossTotals {
            revenue: dec!(1000),
            other_income: dec!(50),
            cost_of_goods_sold: dec!(600),
            operating_expenses: dec!(200),
            other_expenses: dec!(30),
        };
        assert_eq!(totals.gross_profit(), dec!(400));
        assert_eq!(totals.operating_income(), dec!(200));
        assert_eq!(totals.net_income(), dec!(220));
    }
}
