//! Property-based tests for the standard tax calculator.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::{StandardTaxCalculator, TaxCalculation, TaxInput, TaxMethod};

fn arb_price() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1i64..10_000i64).prop_map(|n| Decimal::new(n, 1))
}

fn arb_rate() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        Just(Decimal::ZERO),
        Just(Decimal::new(5, 0)),
        Just(Decimal::new(18, 0)),
        (0i64..3000i64).prop_map(|n| Decimal::new(n, 2)),
    ]
}

fn arb_method() -> impl Strategy<Value = TaxMethod> {
    prop_oneof![Just(TaxMethod::Exclusive), Just(TaxMethod::Inclusive)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 5.1: Net plus tax equals total**
    ///
    /// *For any* valid line and method, line_net + line_tax SHALL equal
    /// line_total and every amount SHALL carry at most 2 decimals.
    #[test]
    fn prop_net_plus_tax_is_total(
        unit_price in arb_price(),
        quantity in arb_quantity(),
        tax_rate in arb_rate(),
        method in arb_method(),
    ) {
        let input = TaxInput { unit_price, quantity, tax_rate, discount: Decimal::ZERO, method };
        let amounts = StandardTaxCalculator::default().calculate(&input).unwrap();

        prop_assert_eq!(amounts.line_net + amounts.line_tax, amounts.line_total);
        prop_assert!(amounts.line_tax >= Decimal::ZERO);
        prop_assert!(amounts.line_net.scale() <= 2);
        prop_assert!(amounts.line_total.scale() <= 2);
    }

    /// **Property 5.2: Calculation is deterministic**
    #[test]
    fn prop_deterministic(
        unit_price in arb_price(),
        quantity in arb_quantity(),
        tax_rate in arb_rate(),
        method in arb_method(),
    ) {
        let input = TaxInput { unit_price, quantity, tax_rate, discount: Decimal::ZERO, method };
        let calculator = StandardTaxCalculator::default();
        prop_assert_eq!(calculator.calculate(&input).unwrap(), calculator.calculate(&input).unwrap());
    }

    /// **Property 5.3: Zero rate means zero tax**
    #[test]
    fn prop_zero_rate_zero_tax(
        unit_price in arb_price(),
        quantity in arb_quantity(),
        method in arb_method(),
    ) {
        let input = TaxInput { unit_price, quantity, tax_rate: Decimal::ZERO, discount: Decimal::ZERO, method };
        let amounts = StandardTaxCalculator::default().calculate(&input).unwrap();
        prop_assert_eq!(amounts.line_tax, Decimal::ZERO);
    }
}
