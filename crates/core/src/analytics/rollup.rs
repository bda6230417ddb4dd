//! Daily sales rollup.
//!
//! A day's delivered orders become one [`DailyBucket`] and one
//! [`CategoryBucket`] per category that sold something. The admin crate
//! upserts both into the summary tables the dashboard reads from.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{CategoryId, OrderId};

/// A delivered order as loaded for the rollup.
#[derive(Debug, Clone)]
pub struct DeliveredOrder {
    pub id: OrderId,
    /// Order grand total (items + shipping + tax).
    pub total: Decimal,
    pub items: Vec<DeliveredItem>,
}

/// One line of a delivered order.
#[derive(Debug, Clone)]
pub struct DeliveredItem {
    pub category_id: CategoryId,
    pub quantity: i32,
    /// `price * quantity` for the line.
    pub total: Decimal,
}

/// Totals for a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub total_sales: Decimal,
    pub total_orders: i32,
    pub total_items: i32,
    pub avg_order_value: Decimal,
}

/// Totals for one category on a single calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBucket {
    pub date: NaiveDate,
    pub category_id: CategoryId,
    pub sales: Decimal,
    /// Distinct orders containing at least one item of the category.
    pub orders: i32,
    pub items: i32,
}

/// Output of [`build_rollup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rollup {
    pub daily: DailyBucket,
    /// Sorted by category id.
    pub categories: Vec<CategoryBucket>,
}

#[derive(Default)]
struct CategoryAccumulator {
    sales: Decimal,
    orders: BTreeSet<OrderId>,
    items: i64,
}

/// Fold a day's delivered orders into rollup buckets.
///
/// Returns `None` when there are no orders, so a day without deliveries
/// leaves any existing rows untouched.
#[must_use]
pub fn build_rollup(date: NaiveDate, orders: &[DeliveredOrder]) -> Option<Rollup> {
    if orders.is_empty() {
        return None;
    }

    let total_sales: Decimal = orders.iter().map(|o| o.total).sum();
    let total_items: i64 = orders
        .iter()
        .flat_map(|o| &o.items)
        .map(|i| i64::from(i.quantity))
        .sum();
    let total_orders = saturating_i32(orders.len());

    let mut by_category: BTreeMap<CategoryId, CategoryAccumulator> = BTreeMap::new();
    for order in orders {
        for item in &order.items {
            let acc = by_category.entry(item.category_id).or_default();
            acc.sales += item.total;
            acc.orders.insert(order.id);
            acc.items += i64::from(item.quantity);
        }
    }

    let categories = by_category
        .into_iter()
        .map(|(category_id, acc)| CategoryBucket {
            date,
            category_id,
            sales: acc.sales,
            orders: saturating_i32(acc.orders.len()),
            items: clamp_i32(acc.items),
        })
        .collect();

    Some(Rollup {
        daily: DailyBucket {
            date,
            total_sales,
            total_orders,
            total_items: clamp_i32(total_items),
            avg_order_value: (total_sales / Decimal::from(total_orders)).round_dp(2),
        },
        categories,
    })
}

fn saturating_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn clamp_i32(n: i64) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 14).unwrap()
    }

    fn item(category: i32, quantity: i32, total: i64) -> DeliveredItem {
        DeliveredItem {
            category_id: CategoryId::new(category),
            quantity,
            total: Decimal::from(total),
        }
    }

    #[test]
    fn test_no_orders_produces_no_buckets() {
        assert!(build_rollup(day(), &[]).is_none());
    }

    #[test]
    fn test_daily_bucket_totals() {
        let orders = vec![
            DeliveredOrder {
                id: OrderId::new(1),
                total: Decimal::from(6600),
                items: vec![item(1, 2, 3000), item(2, 1, 3000)],
            },
            DeliveredOrder {
                id: OrderId::new(2),
                total: Decimal::from(1100),
                items: vec![item(1, 1, 500)],
            },
        ];

        let rollup = build_rollup(day(), &orders).unwrap();
        assert_eq!(rollup.daily.total_sales, Decimal::from(7700));
        assert_eq!(rollup.daily.total_orders, 2);
        assert_eq!(rollup.daily.total_items, 4);
        assert_eq!(rollup.daily.avg_order_value, Decimal::from(3850));
    }

    #[test]
    fn test_category_orders_are_distinct() {
        // Two lines of the same category in one order count as one order.
        let orders = vec![
            DeliveredOrder {
                id: OrderId::new(10),
                total: Decimal::from(2000),
                items: vec![item(3, 1, 800), item(3, 2, 1200)],
            },
            DeliveredOrder {
                id: OrderId::new(11),
                total: Decimal::from(500),
                items: vec![item(3, 1, 500), item(4, 1, 0)],
            },
        ];

        let rollup = build_rollup(day(), &orders).unwrap();
        assert_eq!(rollup.categories.len(), 2);

        let clothing = &rollup.categories[0];
        assert_eq!(clothing.category_id, CategoryId::new(3));
        assert_eq!(clothing.orders, 2);
        assert_eq!(clothing.items, 4);
        assert_eq!(clothing.sales, Decimal::from(2500));
        assert_eq!(clothing.date, day());

        assert_eq!(rollup.categories[1].category_id, CategoryId::new(4));
        assert_eq!(rollup.categories[1].orders, 1);
    }

    #[test]
    fn test_average_is_rounded_to_cents() {
        let orders: Vec<_> = (1..=3)
            .map(|id| DeliveredOrder {
                id: OrderId::new(id),
                total: Decimal::from(if id == 1 { 100 } else { 0 }),
                items: Vec::new(),
            })
            .collect();

        let rollup = build_rollup(day(), &orders).unwrap();
        assert_eq!(rollup.daily.avg_order_value, Decimal::new(3333, 2));
        assert!(rollup.categories.is_empty());
    }
}
