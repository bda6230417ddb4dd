//! Order domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopdesk_core::{
    AddressId, CustomerId, OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId,
};

use super::{money_problem, optional_text};

/// Order number for the `sequence`-th order placed on `date`,
/// e.g. `ORD-20250314-007`.
#[must_use]
pub fn order_number(date: NaiveDate, sequence: u32) -> String {
    format!("ORD-{}-{sequence:03}", date.format("%Y%m%d"))
}

/// Order list row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListItem {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// An order header.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_address_id: Option<AddressId>,
    pub notes: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One order line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: Option<String>,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// Order with its customer and lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<OrderItem>,
}

/// Number of orders in each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub shipped: i64,
    pub delivered: i64,
    pub cancelled: i64,
    pub total: i64,
}

impl StatusCounts {
    /// Build from `(status, count)` rows. Missing statuses count zero.
    #[must_use]
    pub fn from_rows(rows: &[(OrderStatus, i64)]) -> Self {
        rows.iter()
            .fold(Self::default(), |mut counts, &(status, count)| {
                match status {
                    OrderStatus::Pending => counts.pending += count,
                    OrderStatus::Processing => counts.processing += count,
                    OrderStatus::Shipped => counts.shipped += count,
                    OrderStatus::Delivered => counts.delivered += count,
                    OrderStatus::Cancelled => counts.cancelled += count,
                }
                counts.total += count;
                counts
            })
    }
}

/// One requested line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i32>,
}

/// Create request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    pub customer_id: Option<CustomerId>,
    pub items: Option<Vec<OrderItemInput>>,
    pub payment_method: Option<PaymentMethod>,
    pub shipping_address_id: Option<AddressId>,
    /// Overrides the computed shipping fee.
    pub shipping_fee: Option<Decimal>,
    /// Overrides the computed tax.
    pub tax: Option<Decimal>,
    pub notes: Option<String>,
}

/// A validated order line. Lines for the same product are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// A validated order request. Prices are filled in from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub items: Vec<NewOrderItem>,
    pub payment_method: PaymentMethod,
    pub shipping_address_id: Option<AddressId>,
    pub shipping_fee: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub notes: Option<String>,
}

impl OrderInput {
    /// Validate the request shape. Stock and product checks happen against
    /// the database.
    ///
    /// # Errors
    ///
    /// Returns all validation messages when any check fails.
    pub fn validate(self) -> Result<NewOrder, Vec<String>> {
        let mut errors = Vec::new();

        if self.customer_id.is_none() {
            errors.push("Customer is required".to_string());
        }
        if self.payment_method.is_none() {
            errors.push("Payment method is required".to_string());
        }
        if self.shipping_fee.is_some_and(|f| f < Decimal::ZERO) {
            errors.push("Shipping fee must be 0 or more".to_string());
        }
        if self.tax.is_some_and(|t| t < Decimal::ZERO) {
            errors.push("Tax must be 0 or more".to_string());
        }
        for (label, amount) in [("Shipping fee", self.shipping_fee), ("Tax", self.tax)] {
            if let Some(problem) = amount.and_then(|a| money_problem(label, a)) {
                errors.push(problem);
            }
        }

        let lines = self.items.unwrap_or_default();
        if lines.is_empty() {
            errors.push("Order must contain at least one item".to_string());
        }

        let mut merged: BTreeMap<ProductId, i32> = BTreeMap::new();
        for (index, line) in lines.iter().enumerate() {
            let position = index + 1;
            match (line.product_id, line.quantity) {
                (None, _) => errors.push(format!("Item {position}: product is required")),
                (Some(_), None | Some(..=0)) => {
                    errors.push(format!("Item {position}: quantity must be greater than 0"));
                }
                (Some(product_id), Some(quantity)) => {
                    let entry = merged.entry(product_id).or_default();
                    *entry = entry.saturating_add(quantity);
                }
            }
        }

        match (self.customer_id, self.payment_method) {
            (Some(customer_id), Some(payment_method)) if errors.is_empty() => Ok(NewOrder {
                customer_id,
                items: merged
                    .into_iter()
                    .map(|(product_id, quantity)| NewOrderItem {
                        product_id,
                        quantity,
                    })
                    .collect(),
                payment_method,
                shipping_address_id: self.shipping_address_id,
                shipping_fee: self.shipping_fee,
                tax: self.tax,
                notes: optional_text(self.notes),
            }),
            _ => Err(errors),
        }
    }
}

/// `PATCH /api/orders/{id}/status` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateInput {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(product: i32, quantity: i32) -> OrderItemInput {
        OrderItemInput {
            product_id: Some(ProductId::new(product)),
            quantity: Some(quantity),
        }
    }

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(order_number(date, 7), "ORD-20250314-007");
        assert_eq!(order_number(date, 1234), "ORD-20250314-1234");
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let order = OrderInput {
            customer_id: Some(CustomerId::new(1)),
            payment_method: Some(PaymentMethod::CreditCard),
            items: Some(vec![line(2, 1), line(1, 3), line(2, 4)]),
            ..OrderInput::default()
        }
        .validate()
        .unwrap();

        assert_eq!(
            order.items,
            vec![
                NewOrderItem {
                    product_id: ProductId::new(1),
                    quantity: 3
                },
                NewOrderItem {
                    product_id: ProductId::new(2),
                    quantity: 5
                },
            ]
        );
    }

    #[test]
    fn test_invalid_lines_are_reported_by_position() {
        let errors = OrderInput {
            customer_id: Some(CustomerId::new(1)),
            payment_method: Some(PaymentMethod::Cod),
            items: Some(vec![
                line(1, 0),
                OrderItemInput {
                    product_id: None,
                    quantity: Some(1),
                },
            ]),
            ..OrderInput::default()
        }
        .validate()
        .unwrap_err();

        assert_eq!(
            errors,
            vec![
                "Item 1: quantity must be greater than 0",
                "Item 2: product is required",
            ]
        );
    }

    #[test]
    fn test_fee_overrides_must_fit_money_column() {
        let errors = OrderInput {
            customer_id: Some(CustomerId::new(1)),
            payment_method: Some(PaymentMethod::Cod),
            items: Some(vec![line(1, 1)]),
            shipping_fee: Some(Decimal::new(5, 3)),
            tax: Some(Decimal::new(5, 3)),
            ..OrderInput::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Shipping fee must have at most 2 decimal places",
                "Tax must have at most 2 decimal places",
            ]
        );
    }

    #[test]
    fn test_empty_order_rejected() {
        let errors = OrderInput::default().validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Customer is required",
                "Payment method is required",
                "Order must contain at least one item",
            ]
        );
    }

    #[test]
    fn test_status_counts_from_rows() {
        let counts = StatusCounts::from_rows(&[
            (OrderStatus::Pending, 3),
            (OrderStatus::Delivered, 10),
            (OrderStatus::Cancelled, 1),
        ]);
        assert_eq!(counts.pending, 3);
        assert_eq!(counts.processing, 0);
        assert_eq!(counts.total, 14);
    }

    #[test]
    fn test_status_update_parses_screaming_case() {
        let input: StatusUpdateInput =
            serde_json::from_str(r#"{"status":"SHIPPED","paymentStatus":"COMPLETED"}"#).unwrap();
        assert_eq!(input.status, Some(OrderStatus::Shipped));
        assert_eq!(input.payment_status, Some(PaymentStatus::Completed));
    }
}
