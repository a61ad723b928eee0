//! Money math tests
//!
//! Tests for the derived amounts of sales and purchases including:
//! - Property 2: Margin rate is always a finite percentage
//! - Property 3: Weighted-average cost blending
//! - Property 4: Sale figures derivation

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::*;
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two purchases of 10 units at 100 and 200 average to 150
    #[test]
    fn test_blend_two_purchases() {
        let (stock, avg) = blend_average_cost(0, 0, 10, 100);
        assert_eq!((stock, avg), (10, 100));

        let (stock, avg) = blend_average_cost(stock, avg, 10, 200);
        assert_eq!(stock, 20);
        assert_eq!(avg, 150);
    }

    /// 1000 × 5 + VAT 500 at cost 800
    #[test]
    fn test_sale_figures_reference_case() {
        let figures = SaleFigures::compute(1000, 5, 500, 800);
        assert_eq!(figures.supply_price, 5000);
        assert_eq!(figures.total_amount, 5500);
        assert_eq!(figures.profit_amount, 1500);
        assert_eq!(figures.margin_rate, dec("27.3"));
    }

    #[test]
    fn test_margin_rate_zero() {
        assert_eq!(margin_rate(0, 0), Decimal::ZERO);
    }

    #[test]
    fn test_loss_making_sale() {
        let figures = SaleFigures::compute(500, 2, 100, 700);
        assert_eq!(figures.total_amount, 1100);
        assert_eq!(figures.profit_amount, -300);
        assert_eq!(figures.margin_rate, dec("-27.3"));
    }

    #[test]
    fn test_purchase_figures() {
        let figures = PurchaseFigures::compute(800, 10, 800, 1000);
        assert_eq!(figures.supply_amount, 8000);
        assert_eq!(figures.total_amount, 8800);
        assert_eq!(figures.expected_margin, dec("20"));
    }

    #[test]
    fn test_sale_figures_serialize_snake_case() {
        let figures = SaleFigures::compute(1000, 1, 100, 0);
        let json = serde_json::to_value(figures).unwrap();
        assert_eq!(json["supply_price"], 1000);
        assert_eq!(json["total_amount"], 1100);
        assert!(json.get("margin_rate").is_some());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn amount_strategy() -> impl Strategy<Value = Won> {
        0i64..=10_000_000
    }

    fn quantity_strategy() -> impl Strategy<Value = i64> {
        1i64..=10_000
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 2: Margin rate is always a finite percentage
        #[test]
        fn prop_margin_rate_finite(
            profit in -1_000_000_000i64..=1_000_000_000,
            total in -1_000_000_000i64..=1_000_000_000,
        ) {
            let rate = margin_rate(profit, total);
            if total <= 0 {
                prop_assert_eq!(rate, Decimal::ZERO);
            }
            // One fractional digit at most
            prop_assert!(rate.scale() <= 1 || rate == rate.round_dp(1));
        }

        /// Property 2: A sale never earns more than its total
        #[test]
        fn prop_margin_rate_at_most_hundred(
            unit_price in amount_strategy(),
            quantity in quantity_strategy(),
            vat in amount_strategy(),
            cost in amount_strategy(),
        ) {
            let figures = SaleFigures::compute(unit_price, quantity, vat, cost);
            prop_assert!(figures.margin_rate <= Decimal::ONE_HUNDRED);
        }

        /// Property 3: The blended average lies between the two costs
        #[test]
        fn prop_blend_average_within_bounds(
            stock in 1i64..=10_000,
            avg in amount_strategy(),
            quantity in quantity_strategy(),
            cost in amount_strategy(),
        ) {
            let (new_stock, new_avg) = blend_average_cost(stock, avg, quantity, cost);
            prop_assert_eq!(new_stock, stock + quantity);
            prop_assert!(new_avg >= avg.min(cost));
            prop_assert!(new_avg <= avg.max(cost));
        }

        /// Property 3: Stock after a purchase is never below the incoming quantity
        #[test]
        fn prop_blend_stock_at_least_quantity(
            stock in -10_000i64..=10_000,
            avg in amount_strategy(),
            quantity in quantity_strategy(),
            cost in amount_strategy(),
        ) {
            let (new_stock, _) = blend_average_cost(stock, avg, quantity, cost);
            prop_assert!(new_stock >= quantity);
        }

        /// Property 4: total = supply + vat and profit = total - cost × quantity
        #[test]
        fn prop_sale_figures_consistent(
            unit_price in amount_strategy(),
            quantity in quantity_strategy(),
            vat in amount_strategy(),
            cost in amount_strategy(),
        ) {
            let figures = SaleFigures::compute(unit_price, quantity, vat, cost);
            prop_assert_eq!(figures.supply_price, unit_price * quantity);
            prop_assert_eq!(figures.total_amount, figures.supply_price + figures.vat_amount);
            prop_assert_eq!(figures.profit_amount, figures.total_amount - cost * quantity);
        }

        /// Unit price recovered from supply is within half a won per unit
        #[test]
        fn prop_unit_price_from_supply_close(
            unit_price in amount_strategy(),
            quantity in quantity_strategy(),
        ) {
            let supply = supply_amount(unit_price, quantity);
            prop_assert_eq!(unit_price_from_supply(supply, quantity), unit_price);
        }
    }
}
