//! Mapping between `SeaORM` models and domain types.
//!
//! Enum conversions are exhaustive in both directions so a new variant on
//! either side fails to compile until it is mapped.

use tally_core::accounts::{self, Account};
use tally_core::inventory::{self, InventoryItem, StockMovement};
use tally_core::ledger::{self, DocumentReference, LedgerEntry, Transaction, TransactionHeader};
use tally_core::store::StoreError;
use tally_shared::types::{
    AccountId, CurrencyCode, InventoryItemId, LedgerEntryId, OrganizationId, ProductId,
    StockMovementId, TransactionId,
};

use crate::entities::{
    accounts as account_rows, inventory_items, ledger_entries, sea_orm_active_enums as db,
    stock_movements, transactions,
};

macro_rules! mirror_enum {
    ($domain:ty, $row:ty, [$($variant:ident),+ $(,)?]) => {
        impl From<$domain> for $row {
            fn from(value: $domain) -> Self {
                type Source = $domain;
                match value {
                    $(Source::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$row> for $domain {
            fn from(value: $row) -> Self {
                type Source = $row;
                match value {
                    $(Source::$variant => Self::$variant,)+
                }
            }
        }
    };
}

mirror_enum!(
    accounts::AccountType,
    db::AccountType,
    [Asset, Liability, Equity, Revenue, Expense, CostOfSales]
);

mirror_enum!(
    accounts::AccountSubtype,
    db::AccountSubtype,
    [
        Cash,
        Bank,
        AccountsReceivable,
        Inventory,
        CurrentAsset,
        FixedAsset,
        OtherAsset,
        AccountsPayable,
        TaxPayable,
        CurrentLiability,
        LongTermLiability,
        ShareCapital,
        RetainedEarnings,
        OtherEquity,
        OperatingRevenue,
        OtherIncome,
        CostOfGoodsSold,
        OperatingExpense,
        OtherExpense,
    ]
);

mirror_enum!(
    accounts::AccountKind,
    db::AccountKind,
    [
        Revenue,
        Expense,
        CostOfGoodsSold,
        TaxPayable,
        InventoryAsset,
        AccountsReceivable,
        AccountsPayable,
        Cash,
    ]
);

mirror_enum!(
    ledger::TransactionType,
    db::TransactionType,
    [Sale, Bill, Receipt, Payment, BankTransfer, Reversal, Journal, Adjustment]
);

mirror_enum!(ledger::TransactionStatus, db::TransactionStatus, [Draft, Posted, Void]);

mirror_enum!(ledger::EntryType, db::EntryType, [Debit, Credit]);

mirror_enum!(
    inventory::MovementType,
    db::MovementType,
    [Sale, Return, Adjustment, Transfer, Receipt]
);

/// Splits an optional reference into its two nullable columns.
pub(crate) fn reference_columns(reference: Option<&DocumentReference>) -> (Option<String>, Option<String>) {
    reference.map_or((None, None), |r| {
        (Some(r.reference_type.clone()), Some(r.reference_id.clone()))
    })
}

fn reference_from_columns(
    reference_type: Option<String>,
    reference_id: Option<String>,
) -> Option<DocumentReference> {
    match (reference_type, reference_id) {
        (Some(reference_type), Some(reference_id)) => Some(DocumentReference {
            reference_type,
            reference_id,
        }),
        _ => None,
    }
}

pub(crate) fn account_from_row(row: account_rows::Model) -> Account {
    Account {
        id: AccountId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        code: row.code,
        name: row.name,
        account_type: row.account_type.into(),
        account_subtype: row.account_subtype.map(Into::into),
        parent_id: row.parent_id.map(AccountId::from_uuid),
        is_active: row.is_active,
    }
}

pub(crate) fn entry_from_row(row: ledger_entries::Model) -> Result<LedgerEntry, StoreError> {
    let currency = CurrencyCode::parse(&row.currency)
        .map_err(|e| StoreError::Corrupt(format!("ledger entry {}: {e}", row.id)))?;
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(row.id),
        transaction_id: TransactionId::from_uuid(row.transaction_id),
        account_id: AccountId::from_uuid(row.account_id),
        entry_type: row.entry_type.into(),
        amount: row.amount,
        currency,
        exchange_rate: row.exchange_rate,
        amount_in_base: row.amount_in_base,
        description: row.description,
        reconciled: row.reconciled,
    })
}

/// Assembles a transaction from its header row and entry rows ordered by line.
pub(crate) fn transaction_from_rows(
    row: transactions::Model,
    entries: Vec<ledger_entries::Model>,
) -> Result<Transaction, StoreError> {
    Ok(Transaction {
        id: TransactionId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        transaction_number: row.transaction_number,
        transaction_date: row.transaction_date,
        transaction_type: row.transaction_type.into(),
        status: row.status.into(),
        reference: reference_from_columns(row.reference_type, row.reference_id),
        description: row.description,
        reverses_transaction_id: row.reverses_transaction_id.map(TransactionId::from_uuid),
        created_at: row.created_at.to_utc(),
        posted_at: row.posted_at.map(|at| at.to_utc()),
        entries: entries
            .into_iter()
            .map(entry_from_row)
            .collect::<Result<_, _>>()?,
    })
}

pub(crate) fn header_from_row(row: transactions::Model) -> TransactionHeader {
    TransactionHeader {
        id: TransactionId::from_uuid(row.id),
        transaction_date: row.transaction_date,
        transaction_type: row.transaction_type.into(),
        reference: reference_from_columns(row.reference_type, row.reference_id),
        reverses_transaction_id: row.reverses_transaction_id.map(TransactionId::from_uuid),
    }
}

pub(crate) fn inventory_item_from_row(row: inventory_items::Model) -> InventoryItem {
    InventoryItem {
        id: InventoryItemId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        product_id: ProductId::from_uuid(row.product_id),
        location: row.location,
        quantity_on_hand: row.quantity_on_hand,
        quantity_reserved: row.quantity_reserved,
        average_cost: row.average_cost,
        total_value: row.total_value,
        updated_at: row.updated_at.to_utc(),
    }
}

pub(crate) fn movement_from_row(row: stock_movements::Model) -> StockMovement {
    StockMovement {
        id: StockMovementId::from_uuid(row.id),
        organization_id: OrganizationId::from_uuid(row.organization_id),
        inventory_item_id: InventoryItemId::from_uuid(row.inventory_item_id),
        product_id: ProductId::from_uuid(row.product_id),
        location: row.location,
        movement_type: row.movement_type.into(),
        quantity: row.quantity,
        unit_cost: row.unit_cost,
        total_cost: row.total_cost,
        reference: reference_from_columns(row.reference_type, row.reference_id),
        movement_date: row.movement_date,
        created_at: row.created_at.to_utc(),
    }
}
