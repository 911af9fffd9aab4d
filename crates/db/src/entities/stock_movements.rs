//! `SeaORM` Entity for stock_movements table.

use super::sea_orm_active_enums::MovementType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub inventory_item_id: Uuid,
    pub product_id: Uuid,
    pub location: String,
    pub movement_type: MovementType,
    #[sea_orm(column_type = "Decimal(None)")]
    pub quantity: Decimal,
    #[sea_orm(column_type = "Decimal(None)")]
    pub unit_cost: Decimal,
    #[sea_orm(column_type = "Decimal(None)")]
    pub total_cost: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub movement_date: Date,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_items::Entity",
        from = "Column::InventoryItemId",
        to = "super::inventory_items::Column::Id"
    )]
    InventoryItems,
}

impl Related<super::inventory_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
