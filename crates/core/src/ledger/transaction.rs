//! Transaction aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{OrganizationId, TransactionId};

use super::entry::LedgerEntry;
use super::types::{DocumentReference, TransactionStatus, TransactionTotals, TransactionType};

/// A financial transaction consisting of balanced ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Organization this transaction belongs to.
    pub organization_id: OrganizationId,
    /// Sequential number, unique per organization and month.
    pub transaction_number: String,
    /// Transaction date.
    pub transaction_date: NaiveDate,
    /// Business event recorded.
    pub transaction_type: TransactionType,
    /// Current status.
    pub status: TransactionStatus,
    /// Originating business document.
    pub reference: Option<DocumentReference>,
    /// Transaction description.
    pub description: String,
    /// For reversals, the transaction being reversed.
    pub reverses_transaction_id: Option<TransactionId>,
    /// When the transaction was created.
    pub created_at: DateTime<Utc>,
    /// When the transaction was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// Ledger entries.
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
}

/// The header fields of a transaction, without entries.
///
/// Reports filter on headers before aggregating entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// Transaction id.
    pub id: TransactionId,
    /// Transaction date.
    pub transaction_date: NaiveDate,
    /// Business event recorded.
    pub transaction_type: TransactionType,
    /// Originating business document.
    pub reference: Option<DocumentReference>,
    /// For reversals, the transaction being reversed.
    pub reverses_transaction_id: Option<TransactionId>,
}

impl Transaction {
    /// Returns true if the transaction can be edited or discarded.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }

    /// Returns true if this transaction is a reversal of another.
    #[must_use]
    pub fn is_reversal(&self) -> bool {
        self.transaction_type == TransactionType::Reversal || self.reverses_transaction_id.is_some()
    }

    /// Sums the entries.
    #[must_use]
    pub fn totals(&self) -> TransactionTotals {
        let mut totals = TransactionTotals::default();
        for entry in &self.entries {
            totals.add(entry.entry_type, entry.currency, entry.amount, entry.amount_in_base);
        }
        totals
    }

    /// Returns the header view of this transaction.
    #[must_use]
    pub fn header(&self) -> TransactionHeader {
        TransactionHeader {
            id: self.id,
            transaction_date: self.transaction_date,
            transaction_type: self.transaction_type,
            reference: self.reference.clone(),
            reverses_transaction_id: self.reverses_transaction_id,
        }
    }
}
