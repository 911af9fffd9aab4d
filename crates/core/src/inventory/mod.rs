//! Per-product, per-location stock valued at weighted average cost.

mod engine;
mod error;
mod types;
mod valuation;

#[cfg(test)]
mod valuation_props;

pub use engine::InventoryEngine;
pub use error::InventoryError;
pub use types::{
    AddOutcome, DEFAULT_LOCATION, DeductOutcome, InventoryItem, MovementType, StockMovement,
    StockReference,
};
pub use valuation::WeightedAverage;
