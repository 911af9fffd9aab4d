//! Trial balance and cumulative balances read from the committed ledger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tally_shared::types::{AccountId, OrganizationId};
use tracing::{info, warn};

use super::basis::{self, CashBasisFilter, CashSelection};
use super::error::ReportError;
use super::types::{ReportBasis, TrialBalanceEntry, TrialBalanceReport, TrialBalanceTotals};
use crate::accounts::{Account, AccountType};
use crate::fiscal::DateRange;
use crate::ledger::AccountBalance;
use crate::store::{self, BalanceQuery, LedgerSession, LedgerStore, SessionMode};

/// Per-account debit/credit totals over posted transactions.
#[derive(Clone)]
pub struct TrialBalanceService<S> {
    store: S,
    cash_filter: Option<Arc<dyn CashBasisFilter>>,
}

impl<S: LedgerStore> TrialBalanceService<S> {
    /// Creates a service over `store`. Without a settlement source the cash
    /// basis only sees cash-native transactions.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            cash_filter: None,
        }
    }

    /// Attaches the settlement source used by the cash basis.
    #[must_use]
    pub fn with_cash_filter(mut self, filter: Arc<dyn CashBasisFilter>) -> Self {
        self.cash_filter = Some(filter);
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Activity per account within `[start, end]`, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` when `end < start`, or a storage error.
    pub async fn get_trial_balance(
        &self,
        organization_id: OrganizationId,
        start: NaiveDate,
        end: NaiveDate,
        basis: ReportBasis,
    ) -> Result<TrialBalanceReport, ReportError> {
        let period = DateRange::new(start, end)?;
        let mut session = self
            .store
            .begin(organization_id, SessionMode::ReadOnlySnapshot)
            .await?;
        let result: Result<Vec<TrialBalanceEntry>, ReportError> = async {
            let chart = session.accounts().await?;
            let query = BalanceQuery::between(period.start, period.end);
            self.entries_in(&mut session, &chart, query, basis).await
        }
        .await;
        let entries = store::finish(session, result).await?;

        let totals = TrialBalanceTotals::of(&entries);
        info!(
            organization_id = %organization_id,
            start = %period.start,
            end = %period.end,
            accounts = entries.len(),
            balanced = totals.is_balanced,
            "Trial balance generated"
        );
        Ok(TrialBalanceReport {
            start: period.start,
            end: period.end,
            basis,
            entries,
            totals,
        })
    }

    /// Balances from inception through `as_of`, optionally restricted to
    /// some account types.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn get_cumulative_balances(
        &self,
        organization_id: OrganizationId,
        as_of: NaiveDate,
        account_types: &[AccountType],
        basis: ReportBasis,
    ) -> Result<Vec<TrialBalanceEntry>, ReportError> {
        let mut session = self
            .store
            .begin(organization_id, SessionMode::ReadOnlySnapshot)
            .await?;
        let result: Result<Vec<TrialBalanceEntry>, ReportError> = async {
            let chart = session.accounts().await?;
            let mut query = BalanceQuery::through(as_of);
            if !account_types.is_empty() {
                query = query.only_types(account_types);
            }
            self.entries_in(&mut session, &chart, query, basis).await
        }
        .await;
        store::finish(session, result).await
    }
}

impl<S> TrialBalanceService<S> {
    /// Runs `query` under `basis` and joins the totals with `chart`.
    ///
    /// Under the cash basis the qualifying transactions are chosen for the
    /// query's own window.
    pub(crate) async fn entries_in<T: LedgerSession>(
        &self,
        session: &mut T,
        chart: &[Account],
        query: BalanceQuery,
        basis: ReportBasis,
    ) -> Result<Vec<TrialBalanceEntry>, ReportError> {
        let selection = match query.to {
            Some(to) => self.selection_in(session, basis, to).await?,
            None => Selection::All,
        };
        joined_in(session, chart, &selection.scope(query)).await
    }

    /// Transactions counted under `basis` that take effect on or before
    /// `through`.
    pub(crate) async fn selection_in<T: LedgerSession>(
        &self,
        session: &mut T,
        basis: ReportBasis,
        through: NaiveDate,
    ) -> Result<Selection, ReportError> {
        match basis {
            ReportBasis::Accrual => Ok(Selection::All),
            ReportBasis::Cash => basis::cash_selection(session, self.cash_filter.as_deref(), through)
                .await
                .map(Selection::Cash),
        }
    }
}

/// Which posted transactions a report counts.
#[derive(Debug, Clone)]
pub(crate) enum Selection {
    /// Every posted transaction, windowed by transaction date.
    All,
    /// Cash-basis transactions, windowed by effective date.
    Cash(CashSelection),
}

impl Selection {
    /// Narrows `query` to the transactions counted in its date window.
    ///
    /// A cash selection replaces the transaction-date bounds, since a
    /// transaction can take effect after the day it was posted.
    pub(crate) fn scope(&self, query: BalanceQuery) -> BalanceQuery {
        match self {
            Self::All => query,
            Self::Cash(selection) => BalanceQuery {
                from: None,
                to: None,
                transaction_ids: Some(selection.within(query.from, query.to)),
                account_types: query.account_types,
            },
        }
    }
}

/// Runs `query` as given and joins the totals with `chart`.
pub(crate) async fn joined_in<T: LedgerSession>(
    session: &mut T,
    chart: &[Account],
    query: &BalanceQuery,
) -> Result<Vec<TrialBalanceEntry>, ReportError> {
    let totals = session.account_totals(query).await?;
    Ok(join_chart(chart, totals))
}

/// Attaches account details to raw totals, dropping accounts without
/// activity, ordered by code.
fn join_chart(chart: &[Account], totals: Vec<AccountBalance>) -> Vec<TrialBalanceEntry> {
    let by_id: HashMap<AccountId, &Account> = chart.iter().map(|a| (a.id, a)).collect();
    let mut entries: Vec<TrialBalanceEntry> = totals
        .into_iter()
        .filter(|t| t.has_activity())
        .filter_map(|t| {
            let Some(account) = by_id.get(&t.account_id) else {
                warn!(account_id = %t.account_id, "Ledger entries reference an account outside the chart");
                return None;
            };
            Some(TrialBalanceEntry {
                account_id: account.id,
                account_code: account.code.clone(),
                account_name: account.name.clone(),
                account_type: account.account_type,
                account_subtype: account.account_subtype,
                parent_id: account.parent_id,
                debit_total: t.debit_total,
                credit_total: t.credit_total,
                balance: t.balance(account.account_type.normal_balance()),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.account_code.cmp(&b.account_code));
    entries
}
