//! Inventory valuation errors.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by the inventory engine.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Quantity must be strictly positive.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Unit cost must not be negative.
    #[error("Unit cost cannot be negative, got {0}")]
    InvalidUnitCost(Decimal),

    /// Units being taken back out at their original cost are no longer
    /// on hand at that value.
    #[error(
        "Stock already consumed: removing {quantity} units worth {value}, \
         {available_quantity} units worth {available_value} on hand"
    )]
    StockConsumed {
        /// Units to remove.
        quantity: Decimal,
        /// Value to remove.
        value: Decimal,
        /// Units available.
        available_quantity: Decimal,
        /// Value on hand.
        available_value: Decimal,
    },

    /// Storage failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::InvalidUnitCost(_) => "INVALID_UNIT_COST",
            Self::StockConsumed { .. } => "STOCK_CONSUMED",
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidQuantity(_) | Self::InvalidUnitCost(_) => 400,
            Self::StockConsumed { .. } => 422,
            Self::Store(e) => e.http_status_code(),
        }
    }

    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}
