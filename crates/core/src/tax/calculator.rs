//! Inclusive and exclusive tax calculation with banker's rounding.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::TaxError;

/// Whether the unit price already contains tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaxMethod {
    /// Tax is added on top of the price.
    #[default]
    Exclusive,
    /// Tax is extracted from the price.
    Inclusive,
}

/// One document line to price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInput {
    /// Price per unit.
    pub unit_price: Decimal,
    /// Units sold or bought.
    pub quantity: Decimal,
    /// Tax rate in percent (18 means 18%).
    pub tax_rate: Decimal,
    /// Absolute discount applied before tax.
    pub discount: Decimal,
    /// Inclusive or exclusive pricing.
    pub method: TaxMethod,
}

/// Computed line amounts. `line_net + line_tax == line_total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAmounts {
    /// Amount excluding tax.
    pub line_net: Decimal,
    /// Tax on the line.
    pub line_tax: Decimal,
    /// Amount including tax.
    pub line_total: Decimal,
}

/// Pluggable tax strategy.
pub trait TaxCalculation: Send + Sync {
    /// Computes net, tax and total for one line.
    ///
    /// # Errors
    ///
    /// Returns `TaxError` for negative or inconsistent inputs.
    fn calculate(&self, input: &TaxInput) -> Result<LineAmounts, TaxError>;
}

/// Standard VAT-style calculator rounding to a fixed number of decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardTaxCalculator {
    decimal_places: u32,
}

impl StandardTaxCalculator {
    /// Creates a calculator rounding to `decimal_places`.
    #[must_use]
    pub const fn new(decimal_places: u32) -> Self {
        Self { decimal_places }
    }

    fn round(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.decimal_places, RoundingStrategy::MidpointNearestEven)
    }

    fn validate(input: &TaxInput) -> Result<Decimal, TaxError> {
        if input.quantity <= Decimal::ZERO {
            return Err(TaxError::InvalidQuantity(input.quantity));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(TaxError::NegativeUnitPrice(input.unit_price));
        }
        if input.tax_rate < Decimal::ZERO {
            return Err(TaxError::NegativeTaxRate(input.tax_rate));
        }
        let gross = input.unit_price * input.quantity;
        if input.discount < Decimal::ZERO || input.discount > gross {
            return Err(TaxError::InvalidDiscount {
                discount: input.discount,
                gross,
            });
        }
        Ok(gross)
    }
}

impl Default for StandardTaxCalculator {
    fn default() -> Self {
        Self::new(2)
    }
}

impl TaxCalculation for StandardTaxCalculator {
    fn calculate(&self, input: &TaxInput) -> Result<LineAmounts, TaxError> {
        let gross = Self::validate(input)?;
        let rate = input.tax_rate / Decimal::ONE_HUNDRED;

        match input.method {
            TaxMethod::Exclusive => {
                let line_net = self.round(gross - input.discount);
                let line_tax = self.round(line_net * rate);
                Ok(LineAmounts {
                    line_net,
                    line_tax,
                    line_total: line_net + line_tax,
                })
            }
            TaxMethod::Inclusive => {
                let line_total = self.round(gross - input.discount);
                let line_net = self.round(line_total / (Decimal::ONE + rate));
                Ok(LineAmounts {
                    line_net,
                    line_tax: line_total - line_net,
                    line_total,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn line(unit_price: Decimal, quantity: Decimal, tax_rate: Decimal, method: TaxMethod) -> TaxInput {
        TaxInput {
            unit_price,
            quantity,
            tax_rate,
            discount: Decimal::ZERO,
            method,
        }
    }

    #[test]
    fn test_exclusive_adds_tax() {
        let amounts = StandardTaxCalculator::default()
            .calculate(&line(dec!(1000), dec!(1), dec!(10), TaxMethod::Exclusive))
            .unwrap();
        assert_eq!(amounts.line_net, dec!(1000));
        assert_eq!(amounts.line_tax, dec!(100));
        assert_eq!(amounts.line_total, dec!(1100));
    }

    #[test]
    fn test_inclusive_extracts_tax() {
        let amounts = StandardTaxCalculator::default()
            .calculate(&line(dec!(118), dec!(1), dec!(18), TaxMethod::Inclusive))
            .unwrap();
        assert_eq!(amounts.line_total, dec!(118));
        assert_eq!(amounts.line_net, dec!(100));
        assert_eq!(amounts.line_tax, dec!(18));
    }

    #[test]
    fn test_discount_applies_before_tax() {
        let input = TaxInput {
            discount: dec!(50),
            ..line(dec!(100), dec!(3), dec!(10), TaxMethod::Exclusive)
        };
        let amounts = StandardTaxCalculator::default().calculate(&input).unwrap();
        assert_eq!(amounts.line_net, dec!(250));
        assert_eq!(amounts.line_tax, dec!(25));
        assert_eq!(amounts.line_total, dec!(275));
    }

    #[rstest]
    // 0.125 rounds to even 0.12, 0.135 rounds to 0.14
    #[case(dec!(1.25), dec!(0.12))]
    #[case(dec!(1.35), dec!(0.14))]
    fn test_bankers_rounding(#[case] net: Decimal, #[case] expected_tax: Decimal) {
        let amounts = StandardTaxCalculator::default()
            .calculate(&line(net, dec!(1), dec!(10), TaxMethod::Exclusive))
            .unwrap();
        assert_eq!(amounts.line_tax, expected_tax);
    }

    #[test]
    fn test_zero_decimal_currency() {
        let amounts = StandardTaxCalculator::new(0)
            .calculate(&line(dec!(10001), dec!(1), dec!(18), TaxMethod::Exclusive))
            .unwrap();
        assert_eq!(amounts.line_tax, dec!(1800));
        assert_eq!(amounts.line_total, dec!(11801));
    }

    #[rstest]
    #[case(line(dec!(10), dec!(0), dec!(10), TaxMethod::Exclusive), "INVALID_QUANTITY")]
    #[case(line(dec!(-1), dec!(1), dec!(10), TaxMethod::Exclusive), "NEGATIVE_UNIT_PRICE")]
    #[case(line(dec!(10), dec!(1), dec!(-5), TaxMethod::Inclusive), "NEGATIVE_TAX_RATE")]
    #[case(TaxInput { discount: dec!(11), ..line(dec!(10), dec!(1), dec!(10), TaxMethod::Exclusive) }, "INVALID_DISCOUNT")]
    fn test_invalid_inputs(#[case] input: TaxInput, #[case] code: &str) {
        let err = StandardTaxCalculator::default().calculate(&input).unwrap_err();
        assert_eq!(err.error_code(), code);
    }
}
