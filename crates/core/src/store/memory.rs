//! In-process `LedgerStore` used by tests and the engines' own examples.
//!
//! Write sessions hold one store-wide lock for their whole lifetime and work
//! on a staged copy of the organization's state; `commit` swaps the copy in.
//! Read sessions clone a snapshot and never block writers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use tally_shared::types::{AccountId, OrganizationId, ProductId, TransactionId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{
    BalanceQuery, LedgerSession, LedgerStore, SessionMode, StoreError, UNIQUE_ACCOUNT_CODE,
    UNIQUE_DOCUMENT_POSTING, UNIQUE_REVERSAL,
};
use crate::accounts::{Account, AccountKind, DefaultAccounts};
use crate::inventory::{InventoryItem, StockMovement};
use crate::ledger::{
    AccountBalance, DocumentReference, EntryType, Transaction, TransactionHeader,
    TransactionStatus, TransactionType,
};

#[derive(Debug, Clone, Default)]
struct OrgState {
    accounts: HashMap<AccountId, Account>,
    defaults: DefaultAccounts,
    transactions: HashMap<TransactionId, Transaction>,
    reversals: HashMap<TransactionId, TransactionId>,
    sequences: HashMap<(i32, u32), u64>,
    items: HashMap<(ProductId, String), InventoryItem>,
    movements: Vec<StockMovement>,
}

impl OrgState {
    fn claims_document(txn: &Transaction, reference: &DocumentReference) -> bool {
        txn.transaction_type != TransactionType::Reversal
            && txn.status != TransactionStatus::Void
            && txn.reference.as_ref() == Some(reference)
    }
}

type Shared = HashMap<OrganizationId, OrgState>;

/// Thread-safe in-memory ledger storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<Shared>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    type Session = MemorySession;

    async fn begin(
        &self,
        organization_id: OrganizationId,
        mode: SessionMode,
    ) -> Result<MemorySession, StoreError> {
        match mode {
            SessionMode::ReadWrite => {
                let guard = Arc::clone(&self.state).lock_owned().await;
                let staged = guard.get(&organization_id).cloned().unwrap_or_default();
                Ok(MemorySession {
                    organization_id,
                    staged,
                    guard: Some(guard),
                })
            }
            SessionMode::ReadOnlySnapshot => {
                let staged = self
                    .state
                    .lock()
                    .await
                    .get(&organization_id)
                    .cloned()
                    .unwrap_or_default();
                Ok(MemorySession {
                    organization_id,
                    staged,
                    guard: None,
                })
            }
        }
    }
}

/// Session over a [`MemoryStore`].
#[derive(Debug)]
pub struct MemorySession {
    organization_id: OrganizationId,
    staged: OrgState,
    guard: Option<OwnedMutexGuard<Shared>>,
}

impl MemorySession {
    fn writable(&mut self) -> Result<&mut OrgState, StoreError> {
        if self.guard.is_some() {
            Ok(&mut self.staged)
        } else {
            Err(StoreError::ReadOnly)
        }
    }

    fn transaction_mut(&mut self, id: TransactionId) -> Result<&mut Transaction, StoreError> {
        self.writable()?
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))
    }
}

#[async_trait]
impl LedgerSession for MemorySession {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    async fn accounts(&mut self) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self.staged.accounts.values().cloned().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn find_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.staged.accounts.get(id).cloned())
            .collect())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let state = self.writable()?;
        if state.accounts.values().any(|a| a.code == account.code) {
            return Err(StoreError::UniqueViolation {
                constraint: UNIQUE_ACCOUNT_CODE.to_string(),
            });
        }
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let state = self.writable()?;
        if state
            .accounts
            .values()
            .any(|a| a.id != account.id && a.code == account.code)
        {
            return Err(StoreError::UniqueViolation {
                constraint: UNIQUE_ACCOUNT_CODE.to_string(),
            });
        }
        let slot = state
            .accounts
            .get_mut(&account.id)
            .ok_or_else(|| StoreError::NotFound(format!("account {}", account.id)))?;
        *slot = account.clone();
        Ok(())
    }

    async fn account_has_entries(&mut self, account_id: AccountId) -> Result<bool, StoreError> {
        Ok(self
            .staged
            .transactions
            .values()
            .flat_map(|t| &t.entries)
            .any(|e| e.account_id == account_id))
    }

    async fn default_accounts(&mut self) -> Result<DefaultAccounts, StoreError> {
        Ok(self.staged.defaults.clone())
    }

    async fn set_default_account(
        &mut self,
        kind: AccountKind,
        account_id: AccountId,
    ) -> Result<(), StoreError> {
        self.writable()?.defaults.set(kind, account_id);
        Ok(())
    }

    async fn next_transaction_number(&mut self, date: NaiveDate) -> Result<String, StoreError> {
        let state = self.writable()?;
        let next = state
            .sequences
            .entry((date.year(), date.month()))
            .and_modify(|n| *n += 1)
            .or_insert(1);
        Ok(format!("TXN-{:04}{:02}-{next:06}", date.year(), date.month()))
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let state = self.writable()?;
        if let Some(reference) = &transaction.reference {
            if OrgState::claims_document(transaction, reference)
                && state
                    .transactions
                    .values()
                    .any(|t| OrgState::claims_document(t, reference))
            {
                return Err(StoreError::UniqueViolation {
                    constraint: UNIQUE_DOCUMENT_POSTING.to_string(),
                });
            }
        }
        state.transactions.insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn find_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self.staged.transactions.get(&id).cloned())
    }

    async fn find_posting_by_reference(
        &mut self,
        reference: &DocumentReference,
    ) -> Result<Option<Transaction>, StoreError> {
        Ok(self
            .staged
            .transactions
            .values()
            .find(|t| OrgState::claims_document(t, reference))
            .cloned())
    }

    async fn update_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError> {
        let txn = self.transaction_mut(id)?;
        txn.status = status;
        if status == TransactionStatus::Posted {
            txn.posted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError> {
        self.writable()?
            .transactions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))
    }

    async fn claim_reversal(
        &mut self,
        original: TransactionId,
        reversal: TransactionId,
    ) -> Result<(), StoreError> {
        let state = self.writable()?;
        if state.reversals.contains_key(&original) {
            return Err(StoreError::UniqueViolation {
                constraint: UNIQUE_REVERSAL.to_string(),
            });
        }
        state.reversals.insert(original, reversal);
        Ok(())
    }

    async fn reversal_of(
        &mut self,
        original: TransactionId,
    ) -> Result<Option<TransactionId>, StoreError> {
        Ok(self.staged.reversals.get(&original).copied())
    }

    async fn posted_headers(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<TransactionHeader>, StoreError> {
        let mut posted: Vec<&Transaction> = self
            .staged
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Posted)
            .filter(|t| from.is_none_or(|d| t.transaction_date >= d))
            .filter(|t| to.is_none_or(|d| t.transaction_date <= d))
            .collect();
        posted.sort_by(|a, b| {
            (a.transaction_date, &a.transaction_number).cmp(&(b.transaction_date, &b.transaction_number))
        });
        Ok(posted.into_iter().map(Transaction::header).collect())
    }

    async fn account_totals(&mut self, query: &BalanceQuery) -> Result<Vec<AccountBalance>, StoreError> {
        let allowed: Option<HashSet<TransactionId>> = query
            .transaction_ids
            .as_ref()
            .map(|ids| ids.iter().copied().collect());
        let mut totals: BTreeMap<AccountId, AccountBalance> = BTreeMap::new();

        let transactions = self
            .staged
            .transactions
            .values()
            .filter(|t| t.status == TransactionStatus::Posted)
            .filter(|t| query.from.is_none_or(|d| t.transaction_date >= d))
            .filter(|t| query.to.is_none_or(|d| t.transaction_date <= d))
            .filter(|t| allowed.as_ref().is_none_or(|ids| ids.contains(&t.id)));

        for entry in transactions.flat_map(|t| &t.entries) {
            if let Some(types) = &query.account_types {
                let Some(account) = self.staged.accounts.get(&entry.account_id) else {
                    continue;
                };
                if !types.contains(&account.account_type) {
                    continue;
                }
            }
            let balance = totals
                .entry(entry.account_id)
                .or_insert_with(|| AccountBalance::new(entry.account_id));
            match entry.entry_type {
                EntryType::Debit => balance.add_debit(entry.amount_in_base),
                EntryType::Credit => balance.add_credit(entry.amount_in_base),
            }
        }
        Ok(totals.into_values().collect())
    }

    async fn lock_inventory_item(
        &mut self,
        product_id: ProductId,
        location: &str,
    ) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self
            .staged
            .items
            .get(&(product_id, location.to_string()))
            .cloned())
    }

    async fn save_inventory_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        self.writable()?
            .items
            .insert((item.product_id, item.location.clone()), item.clone());
        Ok(())
    }

    async fn insert_stock_movement(&mut self, movement: &StockMovement) -> Result<(), StoreError> {
        self.writable()?.movements.push(movement.clone());
        Ok(())
    }

    async fn stock_movements(
        &mut self,
        reference: &DocumentReference,
    ) -> Result<Vec<StockMovement>, StoreError> {
        Ok(self
            .staged
            .movements
            .iter()
            .filter(|m| m.reference.as_ref() == Some(reference))
            .cloned()
            .collect())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if let Some(mut guard) = self.guard {
            guard.insert(self.organization_id, self.staged);
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_numbers_restart_each_month() {
        let store = MemoryStore::new();
        let mut session = store.begin(OrganizationId::new(), SessionMode::ReadWrite).await.unwrap();

        assert_eq!(session.next_transaction_number(date(2026, 1, 5)).await.unwrap(), "TXN-202601-000001");
        assert_eq!(session.next_transaction_number(date(2026, 1, 31)).await.unwrap(), "TXN-202601-000002");
        assert_eq!(session.next_transaction_number(date(2026, 2, 1)).await.unwrap(), "TXN-202602-000001");
    }

    #[tokio::test]
    async fn test_read_only_session_rejects_writes() {
        let store = MemoryStore::new();
        let mut session = store
            .begin(OrganizationId::new(), SessionMode::ReadOnlySnapshot)
            .await
            .unwrap();
        let err = session.next_transaction_number(date(2026, 1, 1)).await.unwrap_err();
        assert_eq!(err, StoreError::ReadOnly);
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_invisible() {
        let store = MemoryStore::new();
        let org = OrganizationId::new();

        let mut writer = store.begin(org, SessionMode::ReadWrite).await.unwrap();
        writer.next_transaction_number(date(2026, 3, 1)).await.unwrap();
        writer.rollback().await.unwrap();

        let mut writer = store.begin(org, SessionMode::ReadWrite).await.unwrap();
        assert_eq!(writer.next_transaction_number(date(2026, 3, 1)).await.unwrap(), "TXN-202603-000001");
        writer.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_organizations_are_isolated() {
        let store = MemoryStore::new();
        let (a, b) = (OrganizationId::new(), OrganizationId::new());

        let mut session = store.begin(a, SessionMode::ReadWrite).await.unwrap();
        session.set_default_account(AccountKind::Cash, AccountId::new()).await.unwrap();
        session.commit().await.unwrap();

        let mut other = store.begin(b, SessionMode::ReadOnlySnapshot).await.unwrap();
        assert!(other.default_accounts().await.unwrap().get(AccountKind::Cash).is_none());
    }
}
