//! Stock level classification.

use serde::{Deserialize, Serialize};

/// Stock badge shown next to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// Classify a stock level against the product's low-stock threshold.
    ///
    /// `OutOfStock` iff `stock == 0`, `LowStock` iff `0 < stock <= threshold`,
    /// otherwise `InStock`. Negative stock cannot be stored, but is treated as
    /// out of stock.
    #[must_use]
    pub const fn from_levels(stock: i32, low_stock_threshold: i32) -> Self {
        if stock <= 0 {
            Self::OutOfStock
        } else if stock <= low_stock_threshold {
            Self::LowStock
        } else {
            Self::InStock
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_levels_boundaries() {
        assert_eq!(StockStatus::from_levels(0, 10), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_levels(1, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::from_levels(10, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::from_levels(11, 10), StockStatus::InStock);
    }

    #[test]
    fn test_zero_threshold_never_low() {
        assert_eq!(StockStatus::from_levels(1, 0), StockStatus::InStock);
        assert_eq!(StockStatus::from_levels(0, 0), StockStatus::OutOfStock);
    }
}
