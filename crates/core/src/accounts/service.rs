//! Chart of accounts maintenance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, OrganizationId};
use tracing::info;

use super::mapping::validate_subtype;
use super::resolution::{AccountKind, DefaultAccounts};
use super::types::{Account, AccountSubtype, AccountType};
use crate::ledger::LedgerError;
use crate::store::{self, LedgerSession, LedgerStore, SessionMode, StoreError, UNIQUE_ACCOUNT_CODE};

/// Input for creating an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    /// Unique code within the organization.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Top-level classification.
    pub account_type: AccountType,
    /// Optional sub-classification.
    pub account_subtype: Option<AccountSubtype>,
    /// Parent for hierarchical reports.
    pub parent_id: Option<AccountId>,
}

/// Service for configuring an organization's chart of accounts.
#[derive(Debug, Clone)]
pub struct AccountsService<S> {
    store: S,
}

impl<S: LedgerStore> AccountsService<S> {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists the chart ordered by code.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_accounts(&self, organization_id: OrganizationId) -> Result<Vec<Account>, LedgerError> {
        let mut session = self
            .store
            .begin(organization_id, SessionMode::ReadOnlySnapshot)
            .await?;
        let result = session.accounts().await.map_err(LedgerError::from);
        store::finish(session, result).await
    }

    /// Creates an account after checking subtype, code and parent.
    ///
    /// # Errors
    ///
    /// Returns `SubtypeMismatch`, `DuplicateAccountCode`, or `InvalidParent`.
    pub async fn create_account(
        &self,
        organization_id: OrganizationId,
        input: NewAccount,
    ) -> Result<Account, LedgerError> {
        validate_subtype(input.account_type, input.account_subtype)?;

        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<Account, LedgerError> = async {
            if let Some(parent_id) = input.parent_id {
                if session.find_accounts(&[parent_id]).await?.is_empty() {
                    return Err(LedgerError::InvalidParent(parent_id));
                }
            }

            let account = Account {
                id: AccountId::new(),
                organization_id,
                code: input.code.trim().to_string(),
                name: input.name,
                account_type: input.account_type,
                account_subtype: input.account_subtype,
                parent_id: input.parent_id,
                is_active: true,
            };
            session
                .insert_account(&account)
                .await
                .map_err(|e| duplicate_code(e, &account.code))?;

            info!(
                account_id = %account.id,
                code = %account.code,
                account_type = %account.account_type,
                "Account created"
            );
            Ok(account)
        }
        .await;
        store::finish(session, result).await
    }

    /// Changes an account's type and subtype.
    ///
    /// # Errors
    ///
    /// Returns `AccountTypeLocked` once any entry references the account.
    pub async fn change_account_type(
        &self,
        organization_id: OrganizationId,
        account_id: AccountId,
        account_type: AccountType,
        account_subtype: Option<AccountSubtype>,
    ) -> Result<Account, LedgerError> {
        validate_subtype(account_type, account_subtype)?;

        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<Account, LedgerError> = async {
            let mut account = load(&mut session, account_id).await?;
            if account.account_type != account_type && session.account_has_entries(account_id).await? {
                return Err(LedgerError::AccountTypeLocked(account_id));
            }
            account.account_type = account_type;
            account.account_subtype = account_subtype;
            session.update_account(&account).await?;
            Ok(account)
        }
        .await;
        store::finish(session, result).await
    }

    /// Moves an account under a new parent, or to the top level.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParent` if the parent is unknown or is the account
    /// itself or one of its descendants.
    pub async fn set_parent(
        &self,
        organization_id: OrganizationId,
        account_id: AccountId,
        parent_id: Option<AccountId>,
    ) -> Result<Account, LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<Account, LedgerError> = async {
            let chart: HashMap<AccountId, Account> = session
                .accounts()
                .await?
                .into_iter()
                .map(|a| (a.id, a))
                .collect();
            let mut account = chart
                .get(&account_id)
                .cloned()
                .ok_or(LedgerError::UnknownAccount(account_id))?;

            if let Some(parent) = parent_id {
                let mut cursor = Some(parent);
                while let Some(current) = cursor {
                    if current == account_id {
                        return Err(LedgerError::InvalidParent(parent));
                    }
                    cursor = chart
                        .get(&current)
                        .ok_or(LedgerError::InvalidParent(parent))?
                        .parent_id;
                }
            }

            account.parent_id = parent_id;
            session.update_account(&account).await?;
            Ok(account)
        }
        .await;
        store::finish(session, result).await
    }

    /// Deactivates an account. Existing entries are untouched; new postings
    /// to it are rejected.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAccount`.
    pub async fn deactivate(
        &self,
        organization_id: OrganizationId,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<Account, LedgerError> = async {
            let mut account = load(&mut session, account_id).await?;
            account.is_active = false;
            session.update_account(&account).await?;
            info!(account_id = %account_id, code = %account.code, "Account deactivated");
            Ok(account)
        }
        .await;
        store::finish(session, result).await
    }

    /// Configures the default account for a posting role.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAccount`, `InactiveAccount`, or `KindTypeMismatch`.
    pub async fn set_default_account(
        &self,
        organization_id: OrganizationId,
        kind: AccountKind,
        account_id: AccountId,
    ) -> Result<(), LedgerError> {
        let mut session = self.store.begin(organization_id, SessionMode::ReadWrite).await?;
        let result: Result<(), LedgerError> = async {
            let account = load(&mut session, account_id).await?;
            if !account.is_active {
                return Err(LedgerError::InactiveAccount(account_id));
            }
            if !kind.expected_types().contains(&account.account_type) {
                return Err(LedgerError::KindTypeMismatch {
                    kind,
                    account_type: account.account_type,
                });
            }
            session.set_default_account(kind, account_id).await?;
            info!(kind = %kind, account_id = %account_id, "Default account set");
            Ok(())
        }
        .await;
        store::finish(session, result).await
    }

    /// Returns the configured default accounts.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn default_accounts(
        &self,
        organization_id: OrganizationId,
    ) -> Result<DefaultAccounts, LedgerError> {
        let mut session = self
            .store
            .begin(organization_id, SessionMode::ReadOnlySnapshot)
            .await?;
        let result = session.default_accounts().await.map_err(LedgerError::from);
        store::finish(session, result).await
    }
}

async fn load<T: LedgerSession>(session: &mut T, account_id: AccountId) -> Result<Account, LedgerError> {
    session
        .find_accounts(&[account_id])
        .await?
        .pop()
        .ok_or(LedgerError::UnknownAccount(account_id))
}

fn duplicate_code(err: StoreError, code: &str) -> LedgerError {
    if err.is_unique_violation_of(UNIQUE_ACCOUNT_CODE) {
        LedgerError::DuplicateAccountCode(code.to_string())
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::test_support::{date, engine, journal, seed_chart};
    use rust_decimal_macros::dec;

    fn new_account(code: &str, account_type: AccountType, subtype: Option<AccountSubtype>) -> NewAccount {
        NewAccount {
            code: code.to_string(),
            name: format!("Account {code}"),
            account_type,
            account_subtype: subtype,
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_account_validates_subtype_and_code() {
        let store = MemoryStore::new();
        let chart = seed_chart(&store).await;
        let service = AccountsService::new(store.clone());

        let err = service
            .create_account(chart.org, new_account("1600", AccountType::Revenue, Some(AccountSubtype::FixedAsset)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SubtypeMismatch { .. }));

        let err = service
            .create_account(chart.org, new_account("1000", AccountType::Asset, None))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateAccountCode(code) if code == "1000"));

        let created = service
            .create_account(chart.org, new_account("1600", AccountType::Asset, Some(AccountSubtype::FixedAsset)))
            .await
            .unwrap();
        assert!(created.is_active);
    }

    #[tokio::test]
    async fn test_list_accounts_sorted_and_scoped() {
        let store = MemoryStore::new();
        let chart = seed_chart(&store).await;
        let service = AccountsService::new(store.clone());
        service
            .create_account(chart.org, new_account("0500", AccountType::Asset, None))
            .await
            .unwrap();

        let accounts = service.list_accounts(chart.org).await.unwrap();
        assert_eq!(accounts[0].code, "0500");
        assert!(accounts.windows(2).all(|w| w[0].code <= w[1].code));

        let other = service.list_accounts(OrganizationId::new()).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_account_type_locked_after_posting() {
        let store = MemoryStore::new();
        let chart = seed_chart(&store).await;
        let service = AccountsService::new(store.clone());

        // No entries yet: type may change.
        service
            .change_account_type(chart.org, chart.equipment, AccountType::Asset, Some(AccountSubtype::OtherAsset))
            .await
            .unwrap();

        engine(&store)
            .post_transaction(chart.org, journal(date(2026, 1, 2), chart.equipment, chart.cash, dec!(10)))
            .await
            .unwrap();

        let err = service
            .change_account_type(chart.org, chart.equipment, AccountType::Expense, None)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AccountTypeLocked(id) if id == chart.equipment));
    }

    #[tokio::test]
    async fn test_parent_cycle_rejected() {
        let store = MemoryStore::new();
        let chart = seed_chart(&store).await;
        let service = AccountsService::new(store.clone());

        // Utilities sits under occupancy; occupancy cannot move under utilities.
        let err = service
            .set_parent(chart.org, chart.rent, Some(chart.utilities))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidParent(_)));

        let moved = service.set_parent(chart.org, chart.utilities, None).await.unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[tokio::test]
    async fn test_default_account_must_fit_kind() {
        let store = MemoryStore::new();
        let chart = seed_chart(&store).await;
        let service = AccountsService::new(store.clone());

        let err = service
            .set_default_account(chart.org, AccountKind::Cash, chart.sales)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::KindTypeMismatch { .. }));

        service.deactivate(chart.org, chart.bank).await.unwrap();
        let err = service
            .set_default_account(chart.org, AccountKind::Cash, chart.bank)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InactiveAccount(_)));

        service
            .set_default_account(chart.org, AccountKind::Revenue, chart.services)
            .await
            .unwrap();
        let defaults = service.default_accounts(chart.org).await.unwrap();
        assert_eq!(defaults.get(AccountKind::Revenue), Some(chart.services));
    }
}
