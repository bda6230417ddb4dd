//! Order pricing.
//!
//! Subtotal is the sum of line totals. Shipping is free from
//! [`FREE_SHIPPING_THRESHOLD`] upward, otherwise [`STANDARD_SHIPPING_FEE`].
//! Tax is 10% of the subtotal, rounded down to a whole currency unit.

use rust_decimal::Decimal;
use serde::Serialize;

/// Subtotal from which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// Shipping fee below the free-shipping threshold.
pub const STANDARD_SHIPPING_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Consumption tax rate (10%).
pub const TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Computed money fields of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// `price * quantity` for one order line.
#[must_use]
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    price * Decimal::from(quantity)
}

/// Price an order from its line totals.
///
/// Explicit `shipping_fee` / `tax` values replace the computed defaults, so
/// manual orders can waive shipping. The total is always
/// `subtotal + shipping_fee + tax`.
#[must_use]
pub fn price_order(
    line_totals: &[Decimal],
    shipping_fee: Option<Decimal>,
    tax: Option<Decimal>,
) -> OrderTotals {
    let subtotal: Decimal = line_totals.iter().copied().sum();
    let shipping_fee = shipping_fee.unwrap_or(if subtotal >= FREE_SHIPPING_THRESHOLD {
        Decimal::ZERO
    } else {
        STANDARD_SHIPPING_FEE
    });
    let tax = tax.unwrap_or_else(|| (subtotal * TAX_RATE).floor());

    OrderTotals {
        subtotal,
        shipping_fee,
        tax,
        total: subtotal + shipping_fee + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_order_pays_shipping() {
        let totals = price_order(&[line_total(Decimal::from(1980), 2)], None, None);
        assert_eq!(totals.subtotal, Decimal::from(3960));
        assert_eq!(totals.shipping_fee, Decimal::from(500));
        assert_eq!(totals.tax, Decimal::from(396));
        assert_eq!(totals.total, Decimal::from(4856));
    }

    #[test]
    fn test_free_shipping_at_threshold() {
        let totals = price_order(&[Decimal::from(3000), Decimal::from(2000)], None, None);
        assert_eq!(totals.shipping_fee, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::from(500));
        assert_eq!(totals.total, Decimal::from(5500));
    }

    #[test]
    fn test_tax_rounds_down() {
        let totals = price_order(&[Decimal::from(1999)], None, None);
        assert_eq!(totals.tax, Decimal::from(199));
    }

    #[test]
    fn test_overrides_keep_total_invariant() {
        let lines = [Decimal::new(12_345, 2), Decimal::new(500, 2)];
        let totals = price_order(&lines, Some(Decimal::ZERO), Some(Decimal::from(12)));
        assert_eq!(totals.subtotal, Decimal::new(12_845, 2));
        assert_eq!(
            totals.total,
            totals.subtotal + totals.shipping_fee + totals.tax
        );
        assert_eq!(totals.total, Decimal::new(14_045, 2));
    }
}
