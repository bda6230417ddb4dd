//! Product and stock history domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopdesk_core::{CategoryId, ProductId, StockChangeKind, StockHistoryId, StockStatus};

use super::{money_problem, optional_text, required_text};

/// Shortest accepted SKU.
pub const MIN_SKU_LENGTH: usize = 3;

/// Default low-stock threshold for new products.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

/// Category summary embedded in product responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    pub sku: Option<String>,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub stock_status: StockStatus,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub images: Vec<String>,
    pub category: CategoryRef,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for the product list.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive match on name, description, or SKU.
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub is_active: Option<bool>,
}

/// Catalog-wide stock counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStats {
    pub total: i64,
    pub active: i64,
    pub low_stock: i64,
    pub out_of_stock: i64,
}

/// One stock movement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockHistoryEntry {
    pub id: StockHistoryId,
    pub product_id: ProductId,
    #[serde(rename = "type")]
    pub kind: StockChangeKind,
    pub quantity: i32,
    pub reason: String,
    pub before_stock: i32,
    pub after_stock: i32,
    pub created_at: DateTime<Utc>,
}

/// Create/update request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub sku: Option<String>,
    pub stock: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub is_active: Option<bool>,
    pub image_url: Option<String>,
    pub images: Option<Vec<String>>,
}

/// A validated product write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    pub sku: Option<String>,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub category_id: CategoryId,
    pub is_active: bool,
    pub image_url: Option<String>,
    pub images: Vec<String>,
}

impl ProductInput {
    /// Validate the body, collecting every problem.
    ///
    /// # Errors
    ///
    /// Returns all validation messages when any check fails.
    pub fn validate(self) -> Result<NewProduct, Vec<String>> {
        let mut errors = Vec::new();

        let name = required_text(self.name.as_deref());
        if name.is_none() {
            errors.push("Product name is required".to_string());
        }

        let description = required_text(self.description.as_deref());
        if description.is_none() {
            errors.push("Product description is required".to_string());
        }

        let price = self.price.filter(|p| *p > Decimal::ZERO);
        if price.is_none() {
            errors.push("Price must be greater than 0".to_string());
        }
        if let Some(problem) = price.and_then(|p| money_problem("Price", p)) {
            errors.push(problem);
        }

        if self.cost_price.is_some_and(|c| c < Decimal::ZERO) {
            errors.push("Cost price must be 0 or more".to_string());
        }
        if let Some(problem) = self.cost_price.and_then(|c| money_problem("Cost price", c)) {
            errors.push(problem);
        }

        let stock = self.stock.filter(|s| *s >= 0);
        if stock.is_none() {
            errors.push("Stock must be 0 or more".to_string());
        }

        let low_stock_threshold = self.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
        if low_stock_threshold < 0 {
            errors.push("Low stock threshold must be 0 or more".to_string());
        }

        if self.category_id.is_none() {
            errors.push("Category is required".to_string());
        }

        let sku = optional_text(self.sku);
        if sku
            .as_deref()
            .is_some_and(|s| s.chars().count() < MIN_SKU_LENGTH)
        {
            errors.push(format!("SKU must be at least {MIN_SKU_LENGTH} characters"));
        }

        if self.is_active.is_none() {
            errors.push("isActive must be true or false".to_string());
        }

        match (name, description, price, stock, self.category_id, self.is_active) {
            (
                Some(name),
                Some(description),
                Some(price),
                Some(stock),
                Some(category_id),
                Some(is_active),
            ) if errors.is_empty() => Ok(NewProduct {
                name,
                description,
                price,
                cost_price: self.cost_price,
                sku,
                stock,
                low_stock_threshold,
                category_id,
                is_active,
                image_url: optional_text(self.image_url),
                images: self.images.unwrap_or_default(),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_input() -> ProductInput {
        ProductInput {
            name: Some("Linen Shirt".into()),
            description: Some("Breathable summer shirt".into()),
            price: Some(Decimal::new(4980, 0)),
            cost_price: Some(Decimal::new(2100, 0)),
            sku: Some("CLO-SHI-001".into()),
            stock: Some(25),
            low_stock_threshold: Some(5),
            category_id: Some(CategoryId::new(1)),
            is_active: Some(true),
            image_url: None,
            images: None,
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let product = valid_input().validate().unwrap();
        assert_eq!(product.name, "Linen Shirt");
        assert_eq!(product.stock, 25);
        assert!(product.images.is_empty());
    }

    #[test]
    fn test_threshold_defaults_to_ten() {
        let product = ProductInput {
            low_stock_threshold: None,
            ..valid_input()
        }
        .validate()
        .unwrap();
        assert_eq!(product.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
    }

    #[test]
    fn test_all_errors_are_collected() {
        let errors = ProductInput::default().validate().unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Product name is required",
                "Product description is required",
                "Price must be greater than 0",
                "Stock must be 0 or more",
                "Category is required",
                "isActive must be true or false",
            ]
        );
    }

    #[test]
    fn test_short_sku_rejected_blank_sku_dropped() {
        let errors = ProductInput {
            sku: Some("AB".into()),
            ..valid_input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors, vec!["SKU must be at least 3 characters"]);

        let product = ProductInput {
            sku: Some("  ".into()),
            ..valid_input()
        }
        .validate()
        .unwrap();
        assert_eq!(product.sku, None);
    }

    #[test]
    fn test_negative_values_rejected() {
        let errors = ProductInput {
            price: Some(Decimal::ZERO),
            cost_price: Some(Decimal::new(-1, 0)),
            stock: Some(-3),
            low_stock_threshold: Some(-1),
            ..valid_input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_price_must_fit_money_column() {
        let errors = ProductInput {
            price: Some(Decimal::new(4, 3)),
            cost_price: Some(Decimal::new(12_345, 3)),
            ..valid_input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Price must have at most 2 decimal places",
                "Cost price must have at most 2 decimal places",
            ]
        );

        let errors = ProductInput {
            price: Some(Decimal::from(10_000_000_000_i64)),
            ..valid_input()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors, vec!["Price must be less than 10000000000"]);

        let product = ProductInput {
            price: Some(Decimal::new(19_990, 3)),
            ..valid_input()
        }
        .validate()
        .unwrap();
        assert_eq!(product.price, Decimal::new(1999, 2));
    }

    #[test]
    fn test_history_entry_serializes_kind_as_type() {
        let entry = StockHistoryEntry {
            id: StockHistoryId::new(1),
            product_id: ProductId::new(2),
            kind: StockChangeKind::Sale,
            quantity: 3,
            reason: "Order ORD-20250101-001".into(),
            before_stock: 10,
            after_stock: 7,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "SALE");
        assert_eq!(json["beforeStock"], 10);
    }
}
