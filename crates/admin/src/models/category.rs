//! Category domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdesk_core::CategoryId;

use super::{optional_text, required_text};

/// Longest accepted category name.
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;

/// A product category with the number of products filed under it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub product_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

/// A validated category write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
}

impl CategoryInput {
    /// Validate and normalize. `isActive` defaults to true, `sortOrder` to 0.
    ///
    /// # Errors
    ///
    /// Returns every validation message when the input is rejected.
    pub fn validate(self) -> Result<NewCategory, Vec<String>> {
        let mut errors = Vec::new();

        let name = required_text(self.name.as_deref());
        match &name {
            None => errors.push("Category name is required".to_string()),
            Some(n) if n.chars().count() > MAX_CATEGORY_NAME_LENGTH => errors.push(format!(
                "Category name must be at most {MAX_CATEGORY_NAME_LENGTH} characters"
            )),
            Some(_) => {}
        }

        match name {
            Some(name) if errors.is_empty() => Ok(NewCategory {
                name,
                description: optional_text(self.description),
                image_url: optional_text(self.image_url),
                is_active: self.is_active.unwrap_or(true),
                sort_order: self.sort_order.unwrap_or(0),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_applies_defaults_and_trims() {
        let input = CategoryInput {
            name: Some("  Clothing ".into()),
            description: Some("   ".into()),
            ..CategoryInput::default()
        };

        let category = input.validate().unwrap();
        assert_eq!(category.name, "Clothing");
        assert_eq!(category.description, None);
        assert!(category.is_active);
        assert_eq!(category.sort_order, 0);
    }

    #[test]
    fn test_validate_requires_name() {
        let errors = CategoryInput {
            name: Some("  ".into()),
            ..CategoryInput::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors, vec!["Category name is required".to_string()]);
    }

    #[test]
    fn test_validate_rejects_long_name() {
        let errors = CategoryInput {
            name: Some("x".repeat(MAX_CATEGORY_NAME_LENGTH + 1)),
            ..CategoryInput::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 1);
    }
}
