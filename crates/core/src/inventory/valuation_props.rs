//! Property-based tests for weighted-average valuation.
//!
//! - Property 5: Inventory Value Consistency
//! - Property 6: Cost-Neutral Additions

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{OrganizationId, ProductId};

use super::types::InventoryItem;
use super::valuation::WeightedAverage;

const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 6);

#[derive(Debug, Clone)]
enum Op {
    Add(Decimal, Option<Decimal>),
    Deduct(Decimal),
}

fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..10_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn cost() -> impl Strategy<Value = Decimal> {
    (0i64..100_000i64).prop_map(|n| Decimal::new(n, 3))
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (quantity(), prop::option::of(cost())).prop_map(|(q, c)| Op::Add(q, c)),
        quantity().prop_map(Op::Deduct),
    ]
}

fn fresh() -> InventoryItem {
    InventoryItem::empty(OrganizationId::new(), ProductId::new(), "MAIN")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// **Property 5.1: Value equals quantity times average**
    ///
    /// *For any* sequence of adds and deducts, total value SHALL equal
    /// on-hand quantity times average cost within 1e-6, and on-hand SHALL
    /// never go negative.
    #[test]
    fn prop_value_consistent_after_any_sequence(ops in prop::collection::vec(op(), 1..40)) {
        let mut item = fresh();
        for op in ops {
            match op {
                Op::Add(q, c) => { WeightedAverage::add(&mut item, q, c).unwrap(); }
                Op::Deduct(q) => { WeightedAverage::deduct(&mut item, q).unwrap(); }
            }
            let expected = item.quantity_on_hand * item.average_cost;
            prop_assert!((item.total_value - expected).abs() <= TOLERANCE);
            prop_assert!(item.quantity_on_hand >= Decimal::ZERO);
        }
    }

    /// **Property 5.2: Deductions never exceed availability**
    #[test]
    fn prop_deduction_capped(on_hand in quantity(), request in quantity(), unit in cost()) {
        let mut item = fresh();
        WeightedAverage::add(&mut item, on_hand, Some(unit)).unwrap();
        let outcome = WeightedAverage::deduct(&mut item, request).unwrap();

        prop_assert_eq!(outcome.quantity_deducted, request.min(on_hand));
        prop_assert_eq!(outcome.quantity_deducted + outcome.shortfall, request);
    }

    /// **Property 6.1: Cost-neutral additions keep the average**
    ///
    /// *For any* stocked item, adding the same quantity N times without a
    /// unit cost SHALL leave the average cost unchanged.
    #[test]
    fn prop_cost_neutral_add_is_idempotent(
        start in quantity(),
        unit in cost(),
        q in quantity(),
        repeats in 1usize..10,
    ) {
        let mut item = fresh();
        WeightedAverage::add(&mut item, start, Some(unit)).unwrap();
        let average = item.average_cost;

        for _ in 0..repeats {
            WeightedAverage::add(&mut item, q, None).unwrap();
            prop_assert_eq!(item.average_cost, average);
        }
    }
}
