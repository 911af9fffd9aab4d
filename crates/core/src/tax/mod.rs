//! Line-item tax calculation.
//!
//! The same calculator feeds document line persistence and GL posting, so
//! stored line totals and ledger amounts never diverge.

mod calculator;
mod error;

#[cfg(test)]
mod calculator_props;

pub use calculator::{LineAmounts, StandardTaxCalculator, TaxCalculation, TaxInput, TaxMethod};
pub use error::TaxError;
