//! Storage port for the posting and reporting engines.
//!
//! Every engine call runs inside one [`LedgerSession`]: a unit of work
//! scoped to a single organization. Write sessions serialize on the rows
//! they touch; read sessions see one consistent snapshot for their whole
//! lifetime. Nothing is visible to other sessions until `commit`.

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use tally_shared::types::{AccountId, OrganizationId, ProductId, TransactionId};
use tracing::warn;

use crate::accounts::{Account, AccountKind, AccountType, DefaultAccounts};
use crate::inventory::{InventoryItem, StockMovement};
use crate::ledger::{AccountBalance, DocumentReference, Transaction, TransactionHeader, TransactionStatus};

/// Constraint raised when a second non-reversal posting names the same
/// business document.
pub const UNIQUE_DOCUMENT_POSTING: &str = "uq_transactions_document_reference";

/// Constraint raised when a transaction is reversed twice.
pub const UNIQUE_REVERSAL: &str = "uq_transaction_reversals_original";

/// Constraint raised on a duplicate account code.
pub const UNIQUE_ACCOUNT_CODE: &str = "uq_accounts_org_code";

/// Isolation requested when a session begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Posting, reversal, chart maintenance.
    ReadWrite,
    /// Reports: a read-only snapshot shared by every query in the session.
    ReadOnlySnapshot,
}

/// Filter for aggregating posted entries per account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceQuery {
    /// Inclusive lower bound on transaction date. `None` means from inception.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on transaction date.
    pub to: Option<NaiveDate>,
    /// Restrict to these transactions (cash-basis filtering).
    pub transaction_ids: Option<Vec<TransactionId>>,
    /// Restrict to accounts of these types.
    pub account_types: Option<Vec<AccountType>>,
}

impl BalanceQuery {
    /// Entries dated on or before `as_of`.
    #[must_use]
    pub fn through(as_of: NaiveDate) -> Self {
        Self {
            to: Some(as_of),
            ..Self::default()
        }
    }

    /// Entries dated within `[from, to]`.
    #[must_use]
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    /// Restricts the query to the given transactions.
    #[must_use]
    pub fn only_transactions(mut self, ids: Vec<TransactionId>) -> Self {
        self.transaction_ids = Some(ids);
        self
    }

    /// Restricts the query to the given account types.
    #[must_use]
    pub fn only_types(mut self, types: &[AccountType]) -> Self {
        self.account_types = Some(types.to_vec());
        self
    }
}

/// Factory for sessions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Session type produced by this store.
    type Session: LedgerSession;

    /// Opens a unit of work for `organization_id`.
    async fn begin(
        &self,
        organization_id: OrganizationId,
        mode: SessionMode,
    ) -> Result<Self::Session, StoreError>;
}

/// A unit of work scoped to one organization.
///
/// Writes through a `ReadOnlySnapshot` session fail with
/// [`StoreError::ReadOnly`].
#[async_trait]
pub trait LedgerSession: Send {
    /// Organization this session is scoped to.
    fn organization_id(&self) -> OrganizationId;

    // ========== Chart of accounts ==========

    /// Returns the chart of accounts ordered by code.
    async fn accounts(&mut self) -> Result<Vec<Account>, StoreError>;

    /// Returns the accounts with the given ids. Unknown ids are skipped.
    async fn find_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError>;

    /// Inserts a new account.
    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Overwrites an existing account.
    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Returns true if any ledger entry references the account.
    async fn account_has_entries(&mut self, account_id: AccountId) -> Result<bool, StoreError>;

    /// Returns the organization's default posting accounts.
    async fn default_accounts(&mut self) -> Result<DefaultAccounts, StoreError>;

    /// Sets the default account for a posting role.
    async fn set_default_account(
        &mut self,
        kind: AccountKind,
        account_id: AccountId,
    ) -> Result<(), StoreError>;

    // ========== Transactions ==========

    /// Allocates the next number for a transaction dated `date`.
    async fn next_transaction_number(&mut self, date: NaiveDate) -> Result<String, StoreError>;

    /// Inserts a transaction with its entries.
    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError>;

    /// Loads a transaction with its entries, locking it in write sessions.
    async fn find_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Finds the non-reversal, non-void transaction for a document.
    async fn find_posting_by_reference(
        &mut self,
        reference: &DocumentReference,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Updates status and, when posting, the posted-at stamp.
    async fn update_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError>;

    /// Deletes a transaction and its entries.
    async fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError>;

    /// Records that `reversal` reverses `original`.
    ///
    /// Fails with [`UNIQUE_REVERSAL`] if `original` already has one.
    async fn claim_reversal(
        &mut self,
        original: TransactionId,
        reversal: TransactionId,
    ) -> Result<(), StoreError>;

    /// Returns the reversal recorded for `original`, if any.
    async fn reversal_of(
        &mut self,
        original: TransactionId,
    ) -> Result<Option<TransactionId>, StoreError>;

    // ========== Reporting ==========

    /// Headers of posted transactions dated within the bounds.
    async fn posted_headers(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<TransactionHeader>, StoreError>;

    /// Debit and credit totals in base currency per account, over posted
    /// transactions matching `query`. Accounts without entries are omitted.
    async fn account_totals(&mut self, query: &BalanceQuery) -> Result<Vec<AccountBalance>, StoreError>;

    // ========== Inventory ==========

    /// Loads and locks the stock item for a product at a location.
    async fn lock_inventory_item(
        &mut self,
        product_id: ProductId,
        location: &str,
    ) -> Result<Option<InventoryItem>, StoreError>;

    /// Inserts or updates a stock item.
    async fn save_inventory_item(&mut self, item: &InventoryItem) -> Result<(), StoreError>;

    /// Appends a stock movement.
    async fn insert_stock_movement(&mut self, movement: &StockMovement) -> Result<(), StoreError>;

    /// Movements recorded against a document, oldest first.
    async fn stock_movements(
        &mut self,
        reference: &DocumentReference,
    ) -> Result<Vec<StockMovement>, StoreError>;

    // ========== Lifecycle ==========

    /// Makes every write in this session visible.
    async fn commit(self) -> Result<(), StoreError>;

    /// Discards every write in this session.
    async fn rollback(self) -> Result<(), StoreError>;
}

/// Commits on success, rolls back on failure.
///
/// A failed rollback is logged and the original error returned.
///
/// # Errors
///
/// Returns the operation's error, or the commit failure.
pub async fn finish<S, T, E>(session: S, result: Result<T, E>) -> Result<T, E>
where
    S: LedgerSession,
    E: From<StoreError>,
{
    match result {
        Ok(value) => {
            session.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}
