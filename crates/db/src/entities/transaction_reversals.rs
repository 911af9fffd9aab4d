//! `SeaORM` Entity for transaction_reversals table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transaction_reversals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub original_transaction_id: Uuid,
    #[sea_orm(unique)]
    pub reversal_transaction_id: Uuid,
    pub organization_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::OriginalTransactionId",
        to = "super::transactions::Column::Id"
    )]
    Original,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::ReversalTransactionId",
        to = "super::transactions::Column::Id"
    )]
    Reversal,
}

impl ActiveModelBehavior for ActiveModel {}
