//! Money math for sales, purchases and inventory costing
//!
//! All amounts are whole won (KRW has no subunit in this domain). Divisions
//! are carried out in `Decimal` and rounded half-up, so `2.5` becomes `3`
//! and `-2.5` becomes `-2`. Rates are percentages with one fractional digit.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whole-won amount
pub type Won = i64;

/// Round half-up to an integer value
pub fn round_half_up(value: Decimal) -> Decimal {
    (value + Decimal::new(5, 1)).floor()
}

/// Round half-up to one fractional digit (percentages)
pub fn round_rate(value: Decimal) -> Decimal {
    round_half_up(value * Decimal::TEN) / Decimal::TEN
}

/// Round half-up to whole won, saturating at the `i64` range
pub fn round_won(value: Decimal) -> Won {
    let rounded = round_half_up(value);
    rounded.to_i64().unwrap_or(if rounded.is_sign_negative() {
        Won::MIN
    } else {
        Won::MAX
    })
}

/// Supply amount (pre-tax): unit price × quantity
pub fn supply_amount(unit_price: Won, quantity: i64) -> Won {
    unit_price.saturating_mul(quantity)
}

/// VAT-inclusive total
pub fn total_amount(supply: Won, vat: Won) -> Won {
    supply.saturating_add(vat)
}

/// Profit against the cost basis of every unit sold
pub fn profit(total: Won, cost_basis: Won, quantity: i64) -> Won {
    total.saturating_sub(cost_basis.saturating_mul(quantity))
}

/// Profit as a percentage of the VAT-inclusive total.
///
/// Returns zero when the total is not positive, so the result is always a
/// finite percentage.
pub fn margin_rate(profit: Won, total: Won) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    round_rate(Decimal::from(profit) * Decimal::ONE_HUNDRED / Decimal::from(total))
}

/// Margin a purchase is expected to earn at its planned sale price
pub fn expected_margin(expected_sale_price: Won, unit_cost: Won) -> Decimal {
    if expected_sale_price <= 0 {
        return Decimal::ZERO;
    }
    round_rate(
        Decimal::from(expected_sale_price - unit_cost) * Decimal::ONE_HUNDRED
            / Decimal::from(expected_sale_price),
    )
}

/// Unit price recovered from a supply amount when a sheet has no unit price column
pub fn unit_price_from_supply(supply: Won, quantity: i64) -> Won {
    if quantity <= 0 {
        return 0;
    }
    round_won(Decimal::from(supply) / Decimal::from(quantity))
}

/// Blend a purchase into a running weighted-average cost.
///
/// Returns `(new_stock, new_average_cost)`. The new stock never drops below
/// the incoming quantity; when nothing positive is on hand the incoming unit
/// cost becomes the average.
pub fn blend_average_cost(
    current_stock: i64,
    current_avg_cost: Won,
    quantity: i64,
    unit_cost: Won,
) -> (i64, Won) {
    if current_stock <= 0 {
        return (quantity, unit_cost);
    }
    let new_stock = current_stock.saturating_add(quantity).max(quantity);
    if new_stock <= 0 {
        return (new_stock, unit_cost);
    }
    let weighted = Decimal::from(current_avg_cost) * Decimal::from(current_stock)
        + Decimal::from(unit_cost) * Decimal::from(quantity);
    (new_stock, round_won(weighted / Decimal::from(new_stock)))
}

/// All derived amounts of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFigures {
    pub quantity: i64,
    pub unit_price: Won,
    pub supply_price: Won,
    pub vat_amount: Won,
    pub total_amount: Won,
    pub purchase_price: Won,
    pub profit_amount: Won,
    pub margin_rate: Decimal,
}

impl SaleFigures {
    pub fn compute(unit_price: Won, quantity: i64, vat_amount: Won, purchase_price: Won) -> Self {
        let supply_price = supply_amount(unit_price, quantity);
        let total_amount = total_amount(supply_price, vat_amount);
        let profit_amount = profit(total_amount, purchase_price, quantity);
        Self {
            quantity,
            unit_price,
            supply_price,
            vat_amount,
            total_amount,
            purchase_price,
            profit_amount,
            margin_rate: margin_rate(profit_amount, total_amount),
        }
    }
}

/// All derived amounts of a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseFigures {
    pub quantity: i64,
    pub unit_cost: Won,
    pub supply_amount: Won,
    pub vat_amount: Won,
    pub total_amount: Won,
    pub expected_sale_price: Won,
    pub expected_margin: Decimal,
}

impl PurchaseFigures {
    pub fn compute(
        unit_cost: Won,
        quantity: i64,
        vat_amount: Won,
        expected_sale_price: Won,
    ) -> Self {
        let supply = supply_amount(unit_cost, quantity);
        Self {
            quantity,
            unit_cost,
            supply_amount: supply,
            vat_amount,
            total_amount: total_amount(supply, vat_amount),
            expected_sale_price,
            expected_margin: expected_margin(expected_sale_price, unit_cost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(dec("2.5")), dec("3"));
        assert_eq!(round_half_up(dec("2.49")), dec("2"));
        assert_eq!(round_half_up(dec("-2.5")), dec("-2"));
        assert_eq!(round_half_up(dec("-2.51")), dec("-3"));
    }

    #[test]
    fn test_round_rate() {
        assert_eq!(round_rate(dec("27.2727")), dec("27.3"));
        assert_eq!(round_rate(dec("12.25")), dec("12.3"));
        assert_eq!(round_rate(dec("-0.05")), dec("0"));
    }

    #[test]
    fn test_sale_figures() {
        let figures = SaleFigures::compute(1000, 5, 500, 800);
        assert_eq!(figures.supply_price, 5000);
        assert_eq!(figures.total_amount, 5500);
        assert_eq!(figures.profit_amount, 1500);
        assert_eq!(figures.margin_rate, dec("27.3"));
    }

    #[test]
    fn test_margin_rate_zero_total() {
        assert_eq!(margin_rate(0, 0), Decimal::ZERO);
        assert_eq!(margin_rate(-500, 0), Decimal::ZERO);
        assert_eq!(margin_rate(100, -10), Decimal::ZERO);
    }

    #[test]
    fn test_expected_margin() {
        assert_eq!(expected_margin(1000, 800), dec("20"));
        assert_eq!(expected_margin(0, 800), Decimal::ZERO);
        assert_eq!(expected_margin(300, 400), dec("-33.3"));
    }

    #[test]
    fn test_unit_price_fallback() {
        assert_eq!(unit_price_from_supply(10000, 3), 3333);
        assert_eq!(unit_price_from_supply(5, 2), 3);
        assert_eq!(unit_price_from_supply(10000, 0), 0);
    }

    #[test]
    fn test_blend_average_cost() {
        assert_eq!(blend_average_cost(10, 100, 10, 200), (20, 150));
        assert_eq!(blend_average_cost(0, 0, 7, 350), (7, 350));
        // 3 @ 100 + 1 @ 101 = 401 / 4 = 100.25
        assert_eq!(blend_average_cost(3, 100, 1, 101), (4, 100));
    }

    #[test]
    fn test_blend_average_cost_negative_stock_clamps() {
        assert_eq!(blend_average_cost(-50, 120, 10, 90), (10, 90));
    }
}
