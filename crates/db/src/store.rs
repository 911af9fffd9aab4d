//! Postgres implementation of the ledger storage port.
//!
//! A session is one database transaction with the tenant setting applied.
//! Write sessions run at READ COMMITTED and take row locks on the
//! transactions and stock items they mutate; report sessions run at
//! REPEATABLE READ, READ ONLY, so every query sees the same snapshot.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    AccessMode, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, FromQueryResult, IsolationLevel, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, Statement, TransactionTrait, Value,
};
use tally_core::accounts::{Account, AccountKind, DefaultAccounts};
use tally_core::inventory::{InventoryItem, StockMovement};
use tally_core::ledger::{
    AccountBalance, DocumentReference, Transaction, TransactionHeader, TransactionStatus,
};
use tally_core::store::{BalanceQuery, LedgerSession, LedgerStore, SessionMode, StoreError};
use tally_shared::types::{AccountId, OrganizationId, ProductId, TransactionId};
use tracing::debug;
use uuid::Uuid;

use crate::convert::{
    account_from_row, header_from_row, inventory_item_from_row, movement_from_row,
    reference_columns, transaction_from_rows,
};
use crate::entities::{
    accounts, default_accounts, inventory_items, ledger_entries, sea_orm_active_enums as db,
    stock_movements, transaction_reversals, transactions,
};
use crate::error::store_error;
use crate::rls::set_rls_context;

const NEXT_SEQUENCE_SQL: &str = r"
INSERT INTO transaction_sequences (organization_id, period_year, period_month, last_value)
VALUES ($1, $2, $3, 1)
ON CONFLICT (organization_id, period_year, period_month)
DO UPDATE SET last_value = transaction_sequences.last_value + 1
RETURNING last_value
";

/// Ledger store over a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    /// Creates a new store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for SeaOrmStore {
    type Session = SeaOrmSession;

    async fn begin(
        &self,
        organization_id: OrganizationId,
        mode: SessionMode,
    ) -> Result<SeaOrmSession, StoreError> {
        let (isolation, access) = match mode {
            SessionMode::ReadWrite => (IsolationLevel::ReadCommitted, AccessMode::ReadWrite),
            SessionMode::ReadOnlySnapshot => (IsolationLevel::RepeatableRead, AccessMode::ReadOnly),
        };
        let txn = self
            .db
            .begin_with_config(Some(isolation), Some(access))
            .await
            .map_err(store_error)?;
        set_rls_context(&txn, organization_id)
            .await
            .map_err(store_error)?;

        debug!(organization_id = %organization_id, mode = ?mode, "Session started");
        Ok(SeaOrmSession {
            organization_id,
            mode,
            txn,
        })
    }
}

/// One database transaction scoped to an organization.
pub struct SeaOrmSession {
    organization_id: OrganizationId,
    mode: SessionMode,
    txn: DatabaseTransaction,
}

#[derive(Debug, FromQueryResult)]
struct AccountTotalRow {
    account_id: Uuid,
    debit_total: Option<Decimal>,
    credit_total: Option<Decimal>,
}

impl SeaOrmSession {
    fn org(&self) -> Uuid {
        self.organization_id.into_inner()
    }

    fn writable(&self) -> Result<&DatabaseTransaction, StoreError> {
        match self.mode {
            SessionMode::ReadWrite => Ok(&self.txn),
            SessionMode::ReadOnlySnapshot => Err(StoreError::ReadOnly),
        }
    }

    fn locks_rows(&self) -> bool {
        self.mode == SessionMode::ReadWrite
    }

    async fn entries_of(&self, transaction_id: Uuid) -> Result<Vec<ledger_entries::Model>, StoreError> {
        ledger_entries::Entity::find()
            .filter(ledger_entries::Column::TransactionId.eq(transaction_id))
            .order_by_asc(ledger_entries::Column::LineNo)
            .all(&self.txn)
            .await
            .map_err(store_error)
    }

    async fn load(&self, row: Option<transactions::Model>) -> Result<Option<Transaction>, StoreError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let entries = self.entries_of(row.id).await?;
        transaction_from_rows(row, entries).map(Some)
    }

    fn account_model(&self, account: &Account) -> accounts::ActiveModel {
        accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            organization_id: Set(self.org()),
            code: Set(account.code.clone()),
            name: Set(account.name.clone()),
            account_type: Set(account.account_type.into()),
            account_subtype: Set(account.account_subtype.map(Into::into)),
            parent_id: Set(account.parent_id.map(AccountId::into_inner)),
            is_active: Set(account.is_active),
            updated_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LedgerSession for SeaOrmSession {
    fn organization_id(&self) -> OrganizationId {
        self.organization_id
    }

    // ========== Chart of accounts ==========

    async fn accounts(&mut self) -> Result<Vec<Account>, StoreError> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::OrganizationId.eq(self.org()))
            .order_by_asc(accounts::Column::Code)
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(account_from_row).collect())
    }

    async fn find_accounts(&mut self, ids: &[AccountId]) -> Result<Vec<Account>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = accounts::Entity::find()
            .filter(accounts::Column::OrganizationId.eq(self.org()))
            .filter(accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .order_by_asc(accounts::Column::Code)
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(account_from_row).collect())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let txn = self.writable()?;
        let mut model = self.account_model(account);
        model.created_at = Set(Utc::now().fixed_offset());
        model.insert(txn).await.map_err(store_error)?;
        Ok(())
    }

    async fn update_account(&mut self, account: &Account) -> Result<(), StoreError> {
        let txn = self.writable()?;
        self.account_model(account)
            .update(txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn account_has_entries(&mut self, account_id: AccountId) -> Result<bool, StoreError> {
        let entry = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::OrganizationId.eq(self.org()))
            .filter(ledger_entries::Column::AccountId.eq(account_id.into_inner()))
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(entry.is_some())
    }

    async fn default_accounts(&mut self) -> Result<DefaultAccounts, StoreError> {
        let rows = default_accounts::Entity::find()
            .filter(default_accounts::Column::OrganizationId.eq(self.org()))
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().fold(DefaultAccounts::new(), |defaults, row| {
            defaults.with(row.kind.into(), AccountId::from_uuid(row.account_id))
        }))
    }

    async fn set_default_account(
        &mut self,
        kind: AccountKind,
        account_id: AccountId,
    ) -> Result<(), StoreError> {
        let txn = self.writable()?;
        let model = default_accounts::ActiveModel {
            organization_id: Set(self.org()),
            kind: Set(kind.into()),
            account_id: Set(account_id.into_inner()),
            updated_at: Set(Utc::now().fixed_offset()),
        };
        default_accounts::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    default_accounts::Column::OrganizationId,
                    default_accounts::Column::Kind,
                ])
                .update_columns([
                    default_accounts::Column::AccountId,
                    default_accounts::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    // ========== Transactions ==========

    async fn next_transaction_number(&mut self, date: NaiveDate) -> Result<String, StoreError> {
        let txn = self.writable()?;
        let statement = Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_SEQUENCE_SQL,
            [
                Value::from(self.org()),
                Value::from(date.year()),
                Value::from(date.month().cast_signed()),
            ],
        );
        let row = txn
            .query_one(statement)
            .await
            .map_err(store_error)?
            .ok_or_else(|| StoreError::Backend("sequence upsert returned no row".to_string()))?;
        let next: i64 = row.try_get("", "last_value").map_err(store_error)?;
        Ok(format!("TXN-{:04}{:02}-{next:06}", date.year(), date.month()))
    }

    async fn insert_transaction(&mut self, transaction: &Transaction) -> Result<(), StoreError> {
        let txn = self.writable()?;
        let org = self.org();
        let (reference_type, reference_id) = reference_columns(transaction.reference.as_ref());

        transactions::ActiveModel {
            id: Set(transaction.id.into_inner()),
            organization_id: Set(org),
            transaction_number: Set(transaction.transaction_number.clone()),
            transaction_date: Set(transaction.transaction_date),
            transaction_type: Set(transaction.transaction_type.into()),
            status: Set(transaction.status.into()),
            reference_type: Set(reference_type),
            reference_id: Set(reference_id),
            description: Set(transaction.description.clone()),
            reverses_transaction_id: Set(transaction
                .reverses_transaction_id
                .map(TransactionId::into_inner)),
            created_at: Set(transaction.created_at.fixed_offset()),
            posted_at: Set(transaction.posted_at.map(|at| at.fixed_offset())),
        }
        .insert(txn)
        .await
        .map_err(store_error)?;

        if transaction.entries.is_empty() {
            return Ok(());
        }
        let entries = (1_i32..).zip(&transaction.entries).map(|(line_no, entry)| {
            ledger_entries::ActiveModel {
                id: Set(entry.id.into_inner()),
                organization_id: Set(org),
                transaction_id: Set(transaction.id.into_inner()),
                line_no: Set(line_no),
                account_id: Set(entry.account_id.into_inner()),
                entry_type: Set(entry.entry_type.into()),
                amount: Set(entry.amount),
                currency: Set(entry.currency.as_str().to_string()),
                exchange_rate: Set(entry.exchange_rate),
                amount_in_base: Set(entry.amount_in_base),
                debit: Set(entry.debit_in_base()),
                credit: Set(entry.credit_in_base()),
                description: Set(entry.description.clone()),
                reconciled: Set(entry.reconciled),
            }
        });
        ledger_entries::Entity::insert_many(entries)
            .exec_without_returning(txn)
            .await
            .map_err(store_error)?;

        debug!(
            transaction_id = %transaction.id,
            number = %transaction.transaction_number,
            entries = transaction.entries.len(),
            "Transaction stored"
        );
        Ok(())
    }

    async fn find_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        let mut query = transactions::Entity::find_by_id(id.into_inner())
            .filter(transactions::Column::OrganizationId.eq(self.org()));
        if self.locks_rows() {
            query = query.lock_exclusive();
        }
        let row = query.one(&self.txn).await.map_err(store_error)?;
        self.load(row).await
    }

    async fn find_posting_by_reference(
        &mut self,
        reference: &DocumentReference,
    ) -> Result<Option<Transaction>, StoreError> {
        let row = transactions::Entity::find()
            .filter(transactions::Column::OrganizationId.eq(self.org()))
            .filter(transactions::Column::ReferenceType.eq(reference.reference_type.as_str()))
            .filter(transactions::Column::ReferenceId.eq(reference.reference_id.as_str()))
            .filter(transactions::Column::TransactionType.ne(db::TransactionType::Reversal))
            .filter(transactions::Column::Status.ne(db::TransactionStatus::Void))
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        self.load(row).await
    }

    async fn update_transaction_status(
        &mut self,
        id: TransactionId,
        status: TransactionStatus,
    ) -> Result<(), StoreError> {
        let txn = self.writable()?;
        let mut model = transactions::ActiveModel {
            id: Set(id.into_inner()),
            status: Set(status.into()),
            ..Default::default()
        };
        if status == TransactionStatus::Posted {
            model.posted_at = Set(Some(Utc::now().fixed_offset()));
        }
        model.update(txn).await.map_err(store_error)?;
        Ok(())
    }

    async fn delete_transaction(&mut self, id: TransactionId) -> Result<(), StoreError> {
        let txn = self.writable()?;
        let result = transactions::Entity::delete_by_id(id.into_inner())
            .exec(txn)
            .await
            .map_err(store_error)?;
        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("transaction {id}")));
        }
        Ok(())
    }

    async fn claim_reversal(
        &mut self,
        original: TransactionId,
        reversal: TransactionId,
    ) -> Result<(), StoreError> {
        let txn = self.writable()?;
        transaction_reversals::ActiveModel {
            original_transaction_id: Set(original.into_inner()),
            reversal_transaction_id: Set(reversal.into_inner()),
            organization_id: Set(self.org()),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(txn)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn reversal_of(
        &mut self,
        original: TransactionId,
    ) -> Result<Option<TransactionId>, StoreError> {
        let claim = transaction_reversals::Entity::find_by_id(original.into_inner())
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(claim.map(|row| TransactionId::from_uuid(row.reversal_transaction_id)))
    }

    // ========== Reporting ==========

    async fn posted_headers(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<TransactionHeader>, StoreError> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::OrganizationId.eq(self.org()))
            .filter(transactions::Column::Status.eq(db::TransactionStatus::Posted));
        if let Some(from) = from {
            query = query.filter(transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(transactions::Column::TransactionDate.lte(to));
        }
        let rows = query
            .order_by_asc(transactions::Column::TransactionDate)
            .order_by_asc(transactions::Column::TransactionNumber)
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(header_from_row).collect())
    }

    async fn account_totals(&mut self, query: &BalanceQuery) -> Result<Vec<AccountBalance>, StoreError> {
        if query.transaction_ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok(Vec::new());
        }

        let mut select = ledger_entries::Entity::find()
            .select_only()
            .column(ledger_entries::Column::AccountId)
            .column_as(ledger_entries::Column::Debit.sum(), "debit_total")
            .column_as(ledger_entries::Column::Credit.sum(), "credit_total")
            .join(JoinType::InnerJoin, ledger_entries::Relation::Transactions.def())
            .filter(transactions::Column::OrganizationId.eq(self.org()))
            .filter(transactions::Column::Status.eq(db::TransactionStatus::Posted));

        if let Some(from) = query.from {
            select = select.filter(transactions::Column::TransactionDate.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(transactions::Column::TransactionDate.lte(to));
        }
        if let Some(ids) = &query.transaction_ids {
            select = select.filter(transactions::Column::Id.is_in(ids.iter().map(|id| id.into_inner())));
        }
        if let Some(types) = &query.account_types {
            select = select
                .join(JoinType::InnerJoin, ledger_entries::Relation::Accounts.def())
                .filter(
                    accounts::Column::AccountType
                        .is_in(types.iter().map(|t| db::AccountType::from(*t))),
                );
        }

        let rows = select
            .group_by(ledger_entries::Column::AccountId)
            .into_model::<AccountTotalRow>()
            .all(&self.txn)
            .await
            .map_err(store_error)?;

        Ok(rows
            .into_iter()
            .map(|row| AccountBalance {
                account_id: AccountId::from_uuid(row.account_id),
                debit_total: row.debit_total.unwrap_or_default(),
                credit_total: row.credit_total.unwrap_or_default(),
            })
            .collect())
    }

    // ========== Inventory ==========

    async fn lock_inventory_item(
        &mut self,
        product_id: ProductId,
        location: &str,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let mut query = inventory_items::Entity::find()
            .filter(inventory_items::Column::OrganizationId.eq(self.org()))
            .filter(inventory_items::Column::ProductId.eq(product_id.into_inner()))
            .filter(inventory_items::Column::Location.eq(location));
        if self.locks_rows() {
            query = query.lock_exclusive();
        }
        let row = query.one(&self.txn).await.map_err(store_error)?;
        Ok(row.map(inventory_item_from_row))
    }

    async fn save_inventory_item(&mut self, item: &InventoryItem) -> Result<(), StoreError> {
        let txn = self.writable()?;
        let model = inventory_items::ActiveModel {
            id: Set(item.id.into_inner()),
            organization_id: Set(self.org()),
            product_id: Set(item.product_id.into_inner()),
            location: Set(item.location.clone()),
            quantity_on_hand: Set(item.quantity_on_hand),
            quantity_reserved: Set(item.quantity_reserved),
            average_cost: Set(item.average_cost),
            total_value: Set(item.total_value),
            updated_at: Set(item.updated_at.fixed_offset()),
        };
        inventory_items::Entity::insert(model)
            .on_conflict(
                OnConflict::column(inventory_items::Column::Id)
                    .update_columns([
                        inventory_items::Column::QuantityOnHand,
                        inventory_items::Column::QuantityReserved,
                        inventory_items::Column::AverageCost,
                        inventory_items::Column::TotalValue,
                        inventory_items::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn insert_stock_movement(&mut self, movement: &StockMovement) -> Result<(), StoreError> {
        let txn = self.writable()?;
        let (reference_type, reference_id) = reference_columns(movement.reference.as_ref());
        stock_movements::ActiveModel {
            id: Set(movement.id.into_inner()),
            organization_id: Set(self.org()),
            inventory_item_id: Set(movement.inventory_item_id.into_inner()),
            product_id: Set(movement.product_id.into_inner()),
            location: Set(movement.location.clone()),
            movement_type: Set(movement.movement_type.into()),
            quantity: Set(movement.quantity),
            unit_cost: Set(movement.unit_cost),
            total_cost: Set(movement.total_cost),
            reference_type: Set(reference_type),
            reference_id: Set(reference_id),
            movement_date: Set(movement.movement_date),
            created_at: Set(movement.created_at.fixed_offset()),
        }
        .insert(txn)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn stock_movements(
        &mut self,
        reference: &DocumentReference,
    ) -> Result<Vec<StockMovement>, StoreError> {
        let rows = stock_movements::Entity::find()
            .filter(stock_movements::Column::OrganizationId.eq(self.org()))
            .filter(stock_movements::Column::ReferenceType.eq(reference.reference_type.as_str()))
            .filter(stock_movements::Column::ReferenceId.eq(reference.reference_id.as_str()))
            .order_by_asc(stock_movements::Column::CreatedAt)
            .order_by_asc(stock_movements::Column::Id)
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(movement_from_row).collect())
    }

    // ========== Lifecycle ==========

    async fn commit(self) -> Result<(), StoreError> {
        let organization_id = self.organization_id;
        self.txn.commit().await.map_err(store_error)?;
        debug!(organization_id = %organization_id, "Session committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        let organization_id = self.organization_id;
        self.txn.rollback().await.map_err(store_error)?;
        debug!(organization_id = %organization_id, "Session rolled back");
        Ok(())
    }
}
