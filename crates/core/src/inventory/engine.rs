//! Inventory engine: valuation plus the audit trail, inside the caller's
//! unit of work.

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{ProductId, StockMovementId};
use tracing::{debug, info, warn};

use super::error::InventoryError;
use super::types::{AddOutcome, DeductOutcome, InventoryItem, StockMovement, StockReference};
use super::valuation::WeightedAverage;
use crate::store::LedgerSession;

/// Stateless inventory engine.
///
/// Operations take the session of the posting they belong to, so stock and
/// ledger changes commit or roll back together. The item row is locked for
/// the read-modify-write.
pub struct InventoryEngine;

impl InventoryEngine {
    /// Deducts stock at weighted average cost.
    ///
    /// A product with no stock item at `location` is untracked: the result is
    /// zero with no movement and no error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity` or a storage error.
    pub async fn deduct<S: LedgerSession>(
        session: &mut S,
        product_id: ProductId,
        location: &str,
        quantity: Decimal,
        context: &StockReference,
    ) -> Result<DeductOutcome, InventoryError> {
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::InvalidQuantity(quantity));
        }

        let Some(mut item) = session.lock_inventory_item(product_id, location).await? else {
            debug!(product_id = %product_id, location, "Untracked product, skipping deduction");
            return Ok(DeductOutcome::untracked(quantity));
        };

        let outcome = WeightedAverage::deduct(&mut item, quantity)?;
        if outcome.is_short() {
            warn!(
                product_id = %product_id,
                location,
                requested = %outcome.quantity_requested,
                deducted = %outcome.quantity_deducted,
                shortfall = %outcome.shortfall,
                "Insufficient stock"
            );
        }

        Self::persist(
            session,
            &mut item,
            context,
            -outcome.quantity_deducted,
            outcome.unit_cost,
        )
        .await?;

        info!(
            product_id = %product_id,
            location,
            quantity = %outcome.quantity_deducted,
            unit_cost = %outcome.unit_cost,
            "Stock deducted"
        );
        Ok(outcome)
    }

    /// Adds stock, creating the item if absent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidQuantity`, `InvalidUnitCost`, or a storage error.
    pub async fn add<S: LedgerSession>(
        session: &mut S,
        product_id: ProductId,
        location: &str,
        quantity: Decimal,
        unit_cost: Option<Decimal>,
        context: &StockReference,
    ) -> Result<AddOutcome, InventoryError> {
        let mut item = match session.lock_inventory_item(product_id, location).await? {
            Some(item) => item,
            None => InventoryItem::empty(session.organization_id(), product_id, location),
        };

        let outcome = WeightedAverage::add(&mut item, quantity, unit_cost)?;
        Self::persist(session, &mut item, context, outcome.quantity_added, outcome.unit_cost).await?;

        info!(
            product_id = %product_id,
            location,
            quantity = %outcome.quantity_added,
            average_cost = %outcome.average_cost,
            "Stock added"
        );
        Ok(outcome)
    }

    /// Takes back units a receipt brought in, at the receipt's unit cost.
    ///
    /// # Errors
    ///
    /// Returns `StockConsumed` when the units or their value are no longer
    /// on hand, including when the product has no stock item at `location`.
    /// Also `InvalidQuantity`, `InvalidUnitCost`, or a storage error.
    pub async fn remove_at_cost<S: LedgerSession>(
        session: &mut S,
        product_id: ProductId,
        location: &str,
        quantity: Decimal,
        unit_cost: Decimal,
        context: &StockReference,
    ) -> Result<DeductOutcome, InventoryError> {
        let Some(mut item) = session.lock_inventory_item(product_id, location).await? else {
            return Err(InventoryError::StockConsumed {
                quantity,
                value: quantity * unit_cost,
                available_quantity: Decimal::ZERO,
                available_value: Decimal::ZERO,
            });
        };

        let outcome = WeightedAverage::remove_at_cost(&mut item, quantity, unit_cost)?;
        Self::persist(session, &mut item, context, -quantity, unit_cost).await?;

        info!(
            product_id = %product_id,
            location,
            quantity = %quantity,
            unit_cost = %unit_cost,
            average_cost = %item.average_cost,
            "Stock removed at cost"
        );
        Ok(outcome)
    }

    async fn persist<S: LedgerSession>(
        session: &mut S,
        item: &mut InventoryItem,
        context: &StockReference,
        signed_quantity: Decimal,
        unit_cost: Decimal,
    ) -> Result<(), InventoryError> {
        let now = Utc::now();
        item.updated_at = now;
        session.save_inventory_item(item).await?;

        let movement = StockMovement {
            id: StockMovementId::new(),
            organization_id: item.organization_id,
            inventory_item_id: item.id,
            product_id: item.product_id,
            location: item.location.clone(),
            movement_type: context.movement_type,
            quantity: signed_quantity,
            unit_cost,
            total_cost: signed_quantity * unit_cost,
            reference: context.reference.clone(),
            movement_date: context.movement_date,
            created_at: now,
        };
        session.insert_stock_movement(&movement).await?;
        Ok(())
    }
}
