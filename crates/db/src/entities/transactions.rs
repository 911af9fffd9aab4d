//! `SeaORM` Entity for transactions table.

use super::sea_orm_active_enums::{TransactionStatus, TransactionType};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub transaction_number: String,
    pub transaction_date: Date,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub reverses_transaction_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub posted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger_entries::Entity")]
    LedgerEntries,
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ReversesTransactionId",
        to = "Column::Id"
    )]
    SelfRef,
}

impl Related<super::ledger_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
