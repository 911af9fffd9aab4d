//! Weighted-average valuation arithmetic.
//!
//! The average is always recomputed from cumulative totals,
//! `(value + quantity * cost) / (on_hand + quantity)`, and the stored value
//! is always `on_hand * average`, so drift never compounds across movements.

use rust_decimal::Decimal;

use super::error::InventoryError;
use super::types::{AddOutcome, DeductOutcome, InventoryItem};

/// Stateless weighted-average costing.
pub struct WeightedAverage;

impl WeightedAverage {
    /// Takes up to `quantity` units out of `item` at the current average.
    ///
    /// Never takes more than is available; the remainder is reported as
    /// shortfall. The average cost is unchanged by a deduction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` if `quantity` is not positive.
    pub fn deduct(item: &mut InventoryItem, quantity: Decimal) -> Result<DeductOutcome, InventoryError> {
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        let deducted = quantity.min(item.quantity_available());
        let unit_cost = item.average_cost;

        item.quantity_on_hand -= deducted;
        Self::revalue(item);

        Ok(DeductOutcome {
            quantity_requested: quantity,
            quantity_deducted: deducted,
            unit_cost,
            total_cost: deducted * unit_cost,
            shortfall: quantity - deducted,
            tracked: true,
        })
    }

    /// Puts `quantity` units into `item`.
    ///
    /// With `unit_cost` omitted the units come in at the current average,
    /// leaving it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` or `InvalidUnitCost`.
    pub fn add(
        item: &mut InventoryItem,
        quantity: Decimal,
        unit_cost: Option<Decimal>,
    ) -> Result<AddOutcome, InventoryError> {
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        let unit_cost = match unit_cost {
            Some(cost) if cost < Decimal::ZERO => return Err(InventoryError::InvalidUnitCost(cost)),
            Some(cost) => cost,
            None => item.average_cost,
        };
        let value_added = quantity * unit_cost;

        if unit_cost != item.average_cost {
            let new_quantity = item.quantity_on_hand + quantity;
            let new_value = item.total_value + value_added;
            item.average_cost = (new_value / new_quantity).normalize();
        }
        item.quantity_on_hand += quantity;
        Self::revalue(item);

        Ok(AddOutcome {
            quantity_added: quantity,
            unit_cost,
            value_added,
            average_cost: item.average_cost,
        })
    }

    /// Takes `quantity` units out of `item` at `unit_cost` rather than the
    /// average, re-deriving the average from what remains.
    ///
    /// Used to undo a receipt: the value leaving stock equals the value the
    /// receipt brought in.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity`, `InvalidUnitCost`, or `StockConsumed` when
    /// fewer units are available, when the stock is worth less than the
    /// value removed, or when removing every unit would leave value behind.
    pub fn remove_at_cost(
        item: &mut InventoryItem,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> Result<DeductOutcome, InventoryError> {
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::InvalidQuantity(quantity));
        }
        if unit_cost < Decimal::ZERO {
            return Err(InventoryError::InvalidUnitCost(unit_cost));
        }

        let value = quantity * unit_cost;
        let remaining_quantity = item.quantity_on_hand - quantity;
        let remaining_value = item.total_value - value;
        if quantity > item.quantity_available()
            || remaining_value < Decimal::ZERO
            || (remaining_quantity.is_zero() && !remaining_value.is_zero())
        {
            return Err(InventoryError::StockConsumed {
                quantity,
                value,
                available_quantity: item.quantity_available(),
                available_value: item.total_value,
            });
        }

        if !remaining_quantity.is_zero() {
            item.average_cost = (remaining_value / remaining_quantity).normalize();
        }
        item.quantity_on_hand = remaining_quantity;
        Self::revalue(item);

        Ok(DeductOutcome {
            quantity_requested: quantity,
            quantity_deducted: quantity,
            unit_cost,
            total_cost: value,
            shortfall: Decimal::ZERO,
            tracked: true,
        })
    }

    fn revalue(item: &mut InventoryItem) {
        item.total_value = if item.quantity_on_hand.is_zero() {
            Decimal::ZERO
        } else {
            item.quantity_on_hand * item.average_cost
        };
    }
}
