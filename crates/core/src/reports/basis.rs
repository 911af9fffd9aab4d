//! Cash-basis transaction selection.
//!
//! Under the cash basis every transaction takes effect on one date:
//! - a RECEIPT, PAYMENT or BANK_TRANSFER on its own transaction date;
//! - any other transaction on the date its document was first settled, or
//!   its transaction date when that is later;
//! - a reversal on the later of its original's effective date and its own
//!   date.
//!
//! Documents that were never settled never count.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tally_shared::types::{OrganizationId, TransactionId};
use tokio::sync::RwLock;
use tracing::debug;

use super::error::ReportError;
use crate::ledger::{DocumentReference, TransactionHeader};
use crate::store::LedgerSession;

/// Source of document settlement dates, supplied by the invoicing side.
#[async_trait]
pub trait CashBasisFilter: Send + Sync {
    /// First settlement date of every document of `organization_id`
    /// settled on or before `through`.
    async fn settled_through(
        &self,
        organization_id: OrganizationId,
        through: NaiveDate,
    ) -> Result<HashMap<DocumentReference, NaiveDate>, ReportError>;
}

/// In-memory settlement register.
#[derive(Debug, Default)]
pub struct SettlementIndex {
    settlements: RwLock<HashMap<OrganizationId, Vec<(DocumentReference, NaiveDate)>>>,
}

impl SettlementIndex {
    /// Creates an empty register.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `reference` was settled on `settled_on`.
    pub async fn record(
        &self,
        organization_id: OrganizationId,
        reference: DocumentReference,
        settled_on: NaiveDate,
    ) {
        self.settlements
            .write()
            .await
            .entry(organization_id)
            .or_default()
            .push((reference, settled_on));
    }
}

#[async_trait]
impl CashBasisFilter for SettlementIndex {
    async fn settled_through(
        &self,
        organization_id: OrganizationId,
        through: NaiveDate,
    ) -> Result<HashMap<DocumentReference, NaiveDate>, ReportError> {
        let settlements = self.settlements.read().await;
        let mut first: HashMap<DocumentReference, NaiveDate> = HashMap::new();
        for (reference, on) in settlements.get(&organization_id).into_iter().flatten() {
            if *on > through {
                continue;
            }
            first
                .entry(reference.clone())
                .and_modify(|earliest| *earliest = (*earliest).min(*on))
                .or_insert(*on);
        }
        Ok(first)
    }
}

/// Transactions counted under the cash basis, each with its effective date.
#[derive(Debug, Clone, Default)]
pub(crate) struct CashSelection {
    effective: Vec<(TransactionId, NaiveDate)>,
}

impl CashSelection {
    /// Transactions taking effect within `[from, to]`; open bounds are
    /// unbounded.
    pub(crate) fn within(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Vec<TransactionId> {
        self.effective
            .iter()
            .filter(|(_, on)| from.is_none_or(|f| *on >= f) && to.is_none_or(|t| *on <= t))
            .map(|(id, _)| *id)
            .collect()
    }
}

/// Posted transactions taking effect on or before `through` under the cash
/// basis.
pub(crate) async fn cash_selection<S: LedgerSession>(
    session: &mut S,
    filter: Option<&dyn CashBasisFilter>,
    through: NaiveDate,
) -> Result<CashSelection, ReportError> {
    let organization_id = session.organization_id();
    let headers = session.posted_headers(None, Some(through)).await?;
    let settled = match filter {
        Some(filter) => filter.settled_through(organization_id, through).await?,
        None => {
            debug!(organization_id = %organization_id, "No settlement source; cash basis uses cash-native types only");
            HashMap::new()
        }
    };

    let by_id: HashMap<TransactionId, &TransactionHeader> = headers.iter().map(|h| (h.id, h)).collect();
    let effective_on = |header: &TransactionHeader| {
        if header.transaction_type.is_cash_native() {
            return Some(header.transaction_date);
        }
        header
            .reference
            .as_ref()
            .and_then(|r| settled.get(r))
            .map(|settled_on| (*settled_on).max(header.transaction_date))
    };

    let effective = headers
        .iter()
        .filter_map(|h| {
            let on = match h.reverses_transaction_id.and_then(|id| by_id.get(&id)) {
                Some(original) => effective_on(original)?.max(h.transaction_date),
                None => effective_on(h)?,
            };
            (on <= through).then_some((h.id, on))
        })
        .collect();
    Ok(CashSelection { effective })
}
