//! Aggregation properties checked through the public library API.
//!
//! No server or database needed.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use shopdesk_admin::services::dashboard::{KpiInputs, assemble_kpis};
use shopdesk_core::analytics::{
    DeliveredItem, DeliveredOrder, MonthlySales, build_rollup, fill_months, price_order,
    validate_year,
};
use shopdesk_core::analytics::dashboard::MIN_DASHBOARD_YEAR;
use shopdesk_core::{CategoryId, OrderId, OrderStatus, StockStatus};

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn order(id: i32, total: i64, items: &[(i32, i32, i64)]) -> DeliveredOrder {
    DeliveredOrder {
        id: OrderId::new(id),
        total: dec(total),
        items: items
            .iter()
            .map(|&(category, quantity, line)| DeliveredItem {
                category_id: CategoryId::new(category),
                quantity,
                total: dec(line),
            })
            .collect(),
    }
}

#[test]
fn test_yearly_orders_equal_sum_of_months() {
    let months = fill_months(&[
        MonthlySales {
            month: 2,
            sales: dec(40_000),
            orders: 8,
        },
        MonthlySales {
            month: 11,
            sales: dec(90_000),
            orders: 15,
        },
    ]);
    let kpis = assemble_kpis(&months, KpiInputs::default());

    assert_eq!(months.len(), 12);
    assert_eq!(kpis.yearly_orders, months.iter().map(|m| m.orders).sum::<i64>());
    assert_eq!(kpis.yearly_total, months.iter().map(|m| m.sales).sum::<Decimal>());
    assert_eq!(kpis.avg_order_value, (dec(130_000) / dec(23)).round_dp(2));
}

#[test]
fn test_rollup_counts_distinct_orders_per_category() {
    let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap_or_default();
    let rollup = build_rollup(
        date,
        &[
            order(1, 5000, &[(1, 2, 3000), (1, 1, 1500), (2, 1, 500)]),
            order(2, 2000, &[(1, 1, 2000)]),
        ],
    );
    let Some(rollup) = rollup else {
        panic!("expected a rollup for two orders");
    };

    assert_eq!(rollup.daily.total_orders, 2);
    assert_eq!(rollup.daily.total_items, 5);
    assert_eq!(rollup.daily.total_sales, dec(7000));

    let first = rollup
        .categories
        .iter()
        .find(|c| c.category_id == CategoryId::new(1));
    assert_eq!(first.map(|c| c.orders), Some(2));
    assert_eq!(first.map(|c| c.items), Some(4));
    assert_eq!(first.map(|c| c.sales), Some(dec(6500)));

    assert!(build_rollup(date, &[]).is_none());
}

#[test]
fn test_order_total_is_items_plus_shipping_and_tax() {
    let totals = price_order(&[dec(1200), dec(2400)], None, None);
    assert_eq!(totals.subtotal, dec(3600));
    assert_eq!(totals.total, totals.subtotal + totals.shipping_fee + totals.tax);

    let free = price_order(&[dec(5000)], None, None);
    assert_eq!(free.shipping_fee, Decimal::ZERO);
}

#[test]
fn test_status_rules() {
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
    assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    assert_eq!(StockStatus::from_levels(0, 10), StockStatus::OutOfStock);
    assert_eq!(StockStatus::from_levels(3, 10), StockStatus::LowStock);
    assert!(validate_year(MIN_DASHBOARD_YEAR - 1, 2025).is_err());
    assert!(validate_year(2026, 2025).is_err());
    assert_eq!(validate_year(2024, 2025).ok(), Some(2024));
}
