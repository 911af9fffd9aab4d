//! Stock items, movements, and valuation outcomes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{InventoryItemId, OrganizationId, ProductId, StockMovementId};

use crate::ledger::DocumentReference;

/// Location used when a document does not name one.
pub const DEFAULT_LOCATION: &str = "MAIN";

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Goods sold to a customer.
    Sale,
    /// Goods returned into stock.
    Return,
    /// Manual correction or bill reversal.
    Adjustment,
    /// Move between locations.
    Transfer,
    /// Goods received from a supplier.
    Receipt,
}

impl MovementType {
    /// Database and wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sale => "SALE",
            Self::Return => "RETURN",
            Self::Adjustment => "ADJUSTMENT",
            Self::Transfer => "TRANSFER",
            Self::Receipt => "RECEIPT",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SALE" => Ok(Self::Sale),
            "RETURN" => Ok(Self::Return),
            "ADJUSTMENT" => Ok(Self::Adjustment),
            "TRANSFER" => Ok(Self::Transfer),
            "RECEIPT" => Ok(Self::Receipt),
            other => Err(format!("unknown movement type: {other}")),
        }
    }
}

/// Stock of one product at one location, valued at weighted average cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Unique identifier.
    pub id: InventoryItemId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Product held.
    pub product_id: ProductId,
    /// Warehouse or branch code.
    pub location: String,
    /// Units physically held.
    pub quantity_on_hand: Decimal,
    /// Units promised to open orders.
    pub quantity_reserved: Decimal,
    /// Weighted average cost per unit.
    pub average_cost: Decimal,
    /// `quantity_on_hand * average_cost`.
    pub total_value: Decimal,
    /// Last time valuation changed.
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Creates an empty stock item.
    #[must_use]
    pub fn empty(organization_id: OrganizationId, product_id: ProductId, location: impl Into<String>) -> Self {
        Self {
            id: InventoryItemId::new(),
            organization_id,
            product_id,
            location: location.into(),
            quantity_on_hand: Decimal::ZERO,
            quantity_reserved: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            total_value: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    /// Units free to sell: on hand minus reserved, never negative.
    #[must_use]
    pub fn quantity_available(&self) -> Decimal {
        (self.quantity_on_hand - self.quantity_reserved).max(Decimal::ZERO)
    }
}

/// Context recorded on each movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockReference {
    /// Why stock is moving.
    pub movement_type: MovementType,
    /// Document that caused the movement.
    pub reference: Option<DocumentReference>,
    /// Business date of the movement.
    pub movement_date: NaiveDate,
}

impl StockReference {
    /// Creates a movement context for a document.
    #[must_use]
    pub fn new(movement_type: MovementType, reference: Option<DocumentReference>, movement_date: NaiveDate) -> Self {
        Self {
            movement_type,
            reference,
            movement_date,
        }
    }
}

/// Audit record of one stock change. Quantity and cost are signed:
/// negative for outflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Unique identifier.
    pub id: StockMovementId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Stock item affected.
    pub inventory_item_id: InventoryItemId,
    /// Product moved.
    pub product_id: ProductId,
    /// Location moved at.
    pub location: String,
    /// Why stock moved.
    pub movement_type: MovementType,
    /// Signed quantity.
    pub quantity: Decimal,
    /// Unit cost applied.
    pub unit_cost: Decimal,
    /// Signed `quantity * unit_cost`.
    pub total_cost: Decimal,
    /// Originating document.
    pub reference: Option<DocumentReference>,
    /// Business date.
    pub movement_date: NaiveDate,
    /// When the movement was recorded.
    pub created_at: DateTime<Utc>,
}

/// Result of a stock deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductOutcome {
    /// Units asked for.
    pub quantity_requested: Decimal,
    /// Units actually taken: `min(requested, available)`.
    pub quantity_deducted: Decimal,
    /// Average cost the units left at.
    pub unit_cost: Decimal,
    /// `quantity_deducted * unit_cost`.
    pub total_cost: Decimal,
    /// Units requested but not available.
    pub shortfall: Decimal,
    /// False when the product has no stock item at the location.
    pub tracked: bool,
}

impl DeductOutcome {
    /// Outcome for a product that is not stocked at the location.
    #[must_use]
    pub fn untracked(quantity_requested: Decimal) -> Self {
        Self {
            quantity_requested,
            quantity_deducted: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            shortfall: Decimal::ZERO,
            tracked: false,
        }
    }

    /// True when fewer units were deducted than requested.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.shortfall > Decimal::ZERO
    }
}

/// Result of a stock addition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    /// Units added.
    pub quantity_added: Decimal,
    /// Unit cost the units were valued at.
    pub unit_cost: Decimal,
    /// `quantity_added * unit_cost`.
    pub value_added: Decimal,
    /// Average cost after the addition.
    pub average_cost: Decimal,
}
