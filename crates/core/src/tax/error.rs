//! Tax calculation errors.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised for malformed line inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxError {
    /// Quantity must be positive.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Unit price cannot be negative.
    #[error("Unit price cannot be negative, got {0}")]
    NegativeUnitPrice(Decimal),

    /// Tax rate cannot be negative.
    #[error("Tax rate cannot be negative, got {0}")]
    NegativeTaxRate(Decimal),

    /// Discount is negative or larger than the line.
    #[error("Discount {discount} is invalid for a line of {gross}")]
    InvalidDiscount {
        /// The discount.
        discount: Decimal,
        /// Price times quantity.
        gross: Decimal,
    },
}

impl TaxError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::NegativeUnitPrice(_) => "NEGATIVE_UNIT_PRICE",
            Self::NegativeTaxRate(_) => "NEGATIVE_TAX_RATE",
            Self::InvalidDiscount { .. } => "INVALID_DISCOUNT",
        }
    }
}
