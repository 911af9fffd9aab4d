//! Profit & loss and balance sheet generation.
//!
//! Both statements are built from trial-balance entries read inside one
//! read-only snapshot, so every figure on a report sees the same ledger.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, OrganizationId};
use tracing::{info, warn};

use super::error::ReportError;
use super::trial_balance::{self, Selection, TrialBalanceService};
use super::types::{
    BalanceSheetReport, ProfitLossComparison, ProfitLossReport, ProfitLossTotals, ReportBasis,
    ReportLine, ReportSection, TrialBalanceEntry,
};
use crate::accounts::{Account, AccountType, ReportBucket, SUBTYPE_MAPPING_VERSION, bucket_for};
use crate::fiscal::{DateRange, FiscalCalendar};
use crate::store::{self, BalanceQuery, LedgerSession, LedgerStore, SessionMode};

const INCOME_TYPES: [AccountType; 3] = [AccountType::Revenue, AccountType::Expense, AccountType::CostOfSales];
const POSITION_TYPES: [AccountType; 3] = [AccountType::Asset, AccountType::Liability, AccountType::Equity];

/// Options for a profit and loss statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitLossParams {
    /// First day of the period.
    pub start: NaiveDate,
    /// Last day of the period.
    pub end: NaiveDate,
    /// Accrual or cash.
    pub basis: ReportBasis,
    /// Group accounts one level under their parent.
    pub hierarchical: bool,
    /// Add the preceding period of equal length.
    pub include_comparison: bool,
}

impl ProfitLossParams {
    /// Flat accrual statement for `[start, end]`.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            basis: ReportBasis::Accrual,
            hierarchical: false,
            include_comparison: false,
        }
    }

    /// Sets the basis.
    #[must_use]
    pub fn with_basis(mut self, basis: ReportBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Groups accounts under their parents.
    #[must_use]
    pub fn hierarchical(mut self) -> Self {
        self.hierarchical = true;
        self
    }

    /// Adds the prior-period comparison.
    #[must_use]
    pub fn with_comparison(mut self) -> Self {
        self.include_comparison = true;
        self
    }
}

/// Service for the income statement and the statement of financial position.
#[derive(Clone)]
pub struct FinancialReportsService<S> {
    balances: TrialBalanceService<S>,
    calendar: FiscalCalendar,
}

impl<S: LedgerStore> FinancialReportsService<S> {
    /// Creates a service reading through `balances`, with a fiscal year
    /// starting on 1 January.
    #[must_use]
    pub fn new(balances: TrialBalanceService<S>) -> Self {
        Self {
            balances,
            calendar: FiscalCalendar::default(),
        }
    }

    /// Uses `calendar` when a balance sheet request names no fiscal year
    /// start.
    #[must_use]
    pub fn with_fiscal_calendar(mut self, calendar: FiscalCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Generates a profit and loss statement.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` when `end < start`, or a storage error.
    pub async fn generate_profit_loss(
        &self,
        organization_id: OrganizationId,
        params: &ProfitLossParams,
    ) -> Result<ProfitLossReport, ReportError> {
        let period = DateRange::new(params.start, params.end)?;
        let prior = if params.include_comparison {
            Some(period.preceding()?)
        } else {
            None
        };

        let mut session = self
            .balances
            .store()
            .begin(organization_id, SessionMode::ReadOnlySnapshot)
            .await?;
        let result: Result<_, ReportError> = async {
            let chart = session.accounts().await?;
            let selection = self.balances.selection_in(&mut session, params.basis, period.end).await?;
            let current = income_entries(&mut session, &chart, &selection, Some(period.start), period.end).await?;
            let prior_totals = match prior {
                Some(prior) => {
                    let entries =
                        income_entries(&mut session, &chart, &selection, Some(prior.start), prior.end).await?;
                    Some((prior, totals_of(&entries)))
                }
                None => None,
            };
            Ok((chart, current, prior_totals))
        }
        .await;
        let (chart, current, prior_totals) = store::finish(session, result).await?;

        let report = profit_loss(&chart, &current, period, params, prior_totals);
        info!(
            organization_id = %organization_id,
            start = %period.start,
            end = %period.end,
            net_income = %report.net_income,
            "Profit and loss generated"
        );
        Ok(report)
    }

    /// Generates a balance sheet as of `as_of`.
    ///
    /// Retained earnings are the net income before `fiscal_year_start` plus
    /// retained-earnings accounts; current-year earnings are the net income
    /// from `fiscal_year_start` through `as_of`. Under the cash basis the
    /// qualifying transactions are chosen once for the whole statement.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` when the fiscal year starts after `as_of`,
    /// or a storage error.
    pub async fn generate_balance_sheet(
        &self,
        organization_id: OrganizationId,
        as_of: NaiveDate,
        basis: ReportBasis,
        fiscal_year_start: Option<NaiveDate>,
    ) -> Result<BalanceSheetReport, ReportError> {
        let fiscal_year_start = fiscal_year_start.unwrap_or_else(|| self.calendar.year_start_for(as_of));
        if fiscal_year_start > as_of {
            return Err(ReportError::InvalidDateRange {
                start: fiscal_year_start,
                end: as_of,
            });
        }

        let mut session = self
            .balances
            .store()
            .begin(organization_id, SessionMode::ReadOnlySnapshot)
            .await?;
        let result: Result<_, ReportError> = async {
            let chart = session.accounts().await?;
            let selection = self.balances.selection_in(&mut session, basis, as_of).await?;

            let positions = trial_balance::joined_in(
                &mut session,
                &chart,
                &selection.scope(BalanceQuery::through(as_of).only_types(&POSITION_TYPES)),
            )
            .await?;
            let prior_income = match fiscal_year_start.pred_opt() {
                Some(day_before) => {
                    let entries = income_entries(&mut session, &chart, &selection, None, day_before).await?;
                    totals_of(&entries).net_income()
                }
                None => Decimal::ZERO,
            };
            let current = income_entries(&mut session, &chart, &selection, Some(fiscal_year_start), as_of).await?;
            Ok((chart, positions, prior_income, totals_of(&current).net_income()))
        }
        .await;
        let (chart, positions, prior_income, current_year_earnings) = store::finish(session, result).await?;

        let report = balance_sheet(
            &chart,
            &positions,
            as_of,
            basis,
            fiscal_year_start,
            prior_income,
            current_year_earnings,
        );
        let difference = report.difference();
        if difference.is_zero() {
            info!(
                organization_id = %organization_id,
                as_of = %as_of,
                total_assets = %report.total_assets,
                "Balance sheet generated"
            );
        } else {
            warn!(
                organization_id = %organization_id,
                as_of = %as_of,
                difference = %difference,
                "Balance sheet does not balance"
            );
        }
        Ok(report)
    }
}

/// Income-statement entries taking effect within `[from, to]`; `from =
/// None` means since inception. Both statements read income through here.
async fn income_entries<T: LedgerSession>(
    session: &mut T,
    chart: &[Account],
    selection: &Selection,
    from: Option<NaiveDate>,
    to: NaiveDate,
) -> Result<Vec<TrialBalanceEntry>, ReportError> {
    let query = BalanceQuery {
        from,
        ..BalanceQuery::through(to)
    }
    .only_types(&INCOME_TYPES);
    trial_balance::joined_in(session, chart, &selection.scope(query)).await
}

/// Sums income-statement entries into their buckets.
fn totals_of(entries: &[TrialBalanceEntry]) -> ProfitLossTotals {
    let mut totals = ProfitLossTotals::default();
    for entry in entries {
        match bucket_for(entry.account_type, entry.account_subtype) {
            ReportBucket::Revenue => totals.revenue += entry.balance,
            ReportBucket::OtherIncome => totals.other_income += entry.balance,
            ReportBucket::CostOfGoodsSold => totals.cost_of_goods_sold += entry.balance,
            ReportBucket::OperatingExpenses => totals.operating_expenses += entry.balance,
            ReportBucket::OtherExpenses => totals.other_expenses += entry.balance,
            _ => {}
        }
    }
    totals
}

fn by_bucket(entries: &[TrialBalanceEntry]) -> HashMap<ReportBucket, Vec<&TrialBalanceEntry>> {
    let mut buckets: HashMap<ReportBucket, Vec<&TrialBalanceEntry>> = HashMap::new();
    for entry in entries {
        buckets
            .entry(bucket_for(entry.account_type, entry.account_subtype))
            .or_default()
            .push(entry);
    }
    buckets
}

fn profit_loss(
    chart: &[Account],
    entries: &[TrialBalanceEntry],
    period: DateRange,
    params: &ProfitLossParams,
    prior: Option<(DateRange, ProfitLossTotals)>,
) -> ProfitLossReport {
    let chart: HashMap<AccountId, &Account> = chart.iter().map(|a| (a.id, a)).collect();
    let mut buckets = by_bucket(entries);
    let mut section = |name: &str, bucket: ReportBucket| {
        build_section(name, buckets.remove(&bucket).unwrap_or_default(), &chart, params.hierarchical)
    };

    let revenue = section("Revenue", ReportBucket::Revenue);
    let other_income = section("Other Income", ReportBucket::OtherIncome);
    let cost_of_goods_sold = section("Cost of Goods Sold", ReportBucket::CostOfGoodsSold);
    let operating_expenses = section("Operating Expenses", ReportBucket::OperatingExpenses);
    let other_expenses = section("Other Expenses", ReportBucket::OtherExpenses);

    let mut report = ProfitLossReport {
        start: period.start,
        end: period.end,
        basis: params.basis,
        mapping_version: SUBTYPE_MAPPING_VERSION,
        revenue,
        other_income,
        cost_of_goods_sold,
        operating_expenses,
        other_expenses,
        gross_profit: Decimal::ZERO,
        operating_income: Decimal::ZERO,
        net_income: Decimal::ZERO,
        comparison: None,
    };
    let totals = totals_of(entries);
    report.gross_profit = totals.gross_profit();
    report.operating_income = totals.operating_income();
    report.net_income = totals.net_income();
    report.comparison = prior.map(|(range, prior_totals)| {
        ProfitLossComparison::between(&totals, &prior_totals, range.start, range.end)
    });
    report
}

fn balance_sheet(
    chart: &[Account],
    positions: &[TrialBalanceEntry],
    as_of: NaiveDate,
    basis: ReportBasis,
    fiscal_year_start: NaiveDate,
    prior_income: Decimal,
    current_year_earnings: Decimal,
) -> BalanceSheetReport {
    let chart: HashMap<AccountId, &Account> = chart.iter().map(|a| (a.id, a)).collect();
    let mut retained_earnings = prior_income;
    let mut rest = Vec::with_capacity(positions.len());
    for entry in positions {
        let retained = chart
            .get(&entry.account_id)
            .is_some_and(|account| account.is_retained_earnings());
        if retained {
            retained_earnings += entry.balance;
        } else {
            rest.push(entry.clone());
        }
    }

    let mut buckets = by_bucket(&rest);
    if let Some(entries) = buckets.remove(&ReportBucket::RetainedEarnings) {
        retained_earnings += entries.iter().map(|e| e.balance).sum::<Decimal>();
    }
    let mut section =
        |name: &str, bucket: ReportBucket| build_section(name, buckets.remove(&bucket).unwrap_or_default(), &chart, false);

    let current_assets = section("Current Assets", ReportBucket::CurrentAssets);
    let fixed_assets = section("Fixed Assets", ReportBucket::FixedAssets);
    let other_assets = section("Other Assets", ReportBucket::OtherAssets);
    let current_liabilities = section("Current Liabilities", ReportBucket::CurrentLiabilities);
    let long_term_liabilities = section("Long-term Liabilities", ReportBucket::LongTermLiabilities);
    let equity = section("Equity", ReportBucket::OtherEquity);

    let total_assets = current_assets.subtotal + fixed_assets.subtotal + other_assets.subtotal;
    let total_liabilities = current_liabilities.subtotal + long_term_liabilities.subtotal;
    let total_equity = equity.subtotal + retained_earnings + current_year_earnings;

    BalanceSheetReport {
        as_of,
        basis,
        mapping_version: SUBTYPE_MAPPING_VERSION,
        fiscal_year_start,
        current_assets,
        fixed_assets,
        other_assets,
        total_assets,
        current_liabilities,
        long_term_liabilities,
        total_liabilities,
        equity,
        retained_earnings,
        current_year_earnings,
        total_equity,
        total_liabilities_and_equity: total_liabilities + total_equity,
    }
}

fn line(entry: &TrialBalanceEntry) -> ReportLine {
    ReportLine {
        account_id: entry.account_id,
        code: entry.account_code.clone(),
        name: entry.account_name.clone(),
        amount: entry.balance,
    }
}

/// Builds a section from code-ordered entries.
///
/// With `hierarchical`, an entry whose parent exists in the chart goes into
/// a child section named after that parent, and a parent's own entry joins
/// its group. Everything else stays at the top level. Groups are one level
/// deep and ordered by parent code.
fn build_section(
    name: &str,
    entries: Vec<&TrialBalanceEntry>,
    chart: &HashMap<AccountId, &Account>,
    hierarchical: bool,
) -> ReportSection {
    let mut section = ReportSection::named(name);
    if hierarchical {
        let parents: HashSet<AccountId> = entries
            .iter()
            .filter_map(|e| e.parent_id)
            .filter(|id| chart.contains_key(id))
            .collect();
        let mut groups: BTreeMap<(String, AccountId), ReportSection> = BTreeMap::new();
        for entry in entries {
            let group = match entry.parent_id.filter(|id| chart.contains_key(id)) {
                Some(parent) => Some(parent),
                None if parents.contains(&entry.account_id) => Some(entry.account_id),
                None => None,
            };
            match group.and_then(|id| chart.get(&id)) {
                Some(parent) => groups
                    .entry((parent.code.clone(), parent.id))
                    .or_insert_with(|| ReportSection::named(parent.name.clone()))
                    .accounts
                    .push(line(entry)),
                None => section.accounts.push(line(entry)),
            }
        }
        section.children = groups
            .into_values()
            .map(|mut child| {
                child.subtotal = child.accounts.iter().map(|l| l.amount).sum();
                child
            })
            .collect();
    } else {
        section.accounts = entries.into_iter().map(line).collect();
    }
    section.subtotal = section.accounts.iter().map(|l| l.amount).sum::<Decimal>()
        + section.children.iter().map(|c| c.subtotal).sum::<Decimal>();
    section
}
