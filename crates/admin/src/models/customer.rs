//! Customer and address domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shopdesk_core::{AddressId, CustomerId, Email};

use super::{optional_text, required_text};

/// A customer counts as active when they ordered within this many days.
pub const ACTIVE_WINDOW_DAYS: i32 = 90;

/// A shop customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer list row with order aggregates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    #[serde(flatten)]
    pub customer: Customer,
    pub order_count: i64,
    /// Sum of delivered order totals.
    pub total_spent: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
    /// Ordered within the last [`ACTIVE_WINDOW_DAYS`] days.
    pub is_active: bool,
}

/// Customer with addresses, returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub summary: CustomerSummary,
    pub addresses: Vec<Address>,
}

/// A shipping address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub id: AddressId,
    pub customer_id: CustomerId,
    pub name: String,
    pub zip_code: String,
    pub prefecture: String,
    pub city: String,
    pub address1: String,
    pub address2: Option<String>,
    pub phone: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Create/update request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// A validated customer write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
}

impl CustomerInput {
    /// Validate and normalize the body.
    ///
    /// # Errors
    ///
    /// Returns all validation messages when any check fails.
    pub fn validate(self) -> Result<NewCustomer, Vec<String>> {
        let mut errors = Vec::new();

        let email = match self.email.as_deref().map(Email::parse) {
            None => {
                errors.push("Email is required".to_string());
                None
            }
            Some(Err(e)) => {
                errors.push(format!("Invalid email: {e}"));
                None
            }
            Some(Ok(email)) => Some(email),
        };

        let name = required_text(self.name.as_deref());
        if name.is_none() {
            errors.push("Customer name is required".to_string());
        }

        match (email, name) {
            (Some(email), Some(name)) => Ok(NewCustomer {
                email,
                name,
                phone: optional_text(self.phone),
            }),
            _ => Err(errors),
        }
    }
}

/// Address request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub name: Option<String>,
    pub zip_code: Option<String>,
    pub prefecture: Option<String>,
    pub city: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub phone: Option<String>,
    pub is_default: Option<bool>,
}

/// A validated address write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    pub name: String,
    pub zip_code: String,
    pub prefecture: String,
    pub city: String,
    pub address1: String,
    pub address2: Option<String>,
    pub phone: Option<String>,
    pub is_default: bool,
}

impl AddressInput {
    /// Validate and normalize the body.
    ///
    /// # Errors
    ///
    /// Returns one message per missing required field.
    pub fn validate(self) -> Result<NewAddress, Vec<String>> {
        let mut errors = Vec::new();
        let mut required = |value: Option<&str>, label: &str| {
            let text = required_text(value);
            if text.is_none() {
                errors.push(format!("{label} is required"));
            }
            text
        };

        let name = required(self.name.as_deref(), "Recipient name");
        let zip_code = required(self.zip_code.as_deref(), "Zip code");
        let prefecture = required(self.prefecture.as_deref(), "Prefecture");
        let city = required(self.city.as_deref(), "City");
        let address1 = required(self.address1.as_deref(), "Address line 1");

        match (name, zip_code, prefecture, city, address1) {
            (Some(name), Some(zip_code), Some(prefecture), Some(city), Some(address1)) => {
                Ok(NewAddress {
                    name,
                    zip_code,
                    prefecture,
                    city,
                    address1,
                    address2: optional_text(self.address2),
                    phone: optional_text(self.phone),
                    is_default: self.is_default.unwrap_or(false),
                })
            }
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_email_normalized() {
        let customer = CustomerInput {
            email: Some(" Hanako@Example.COM ".into()),
            name: Some("Hanako Yamada".into()),
            phone: Some(String::new()),
        }
        .validate()
        .unwrap();
        assert_eq!(customer.email.as_str(), "hanako@example.com");
        assert_eq!(customer.phone, None);
    }

    #[test]
    fn test_customer_errors_collected() {
        let errors = CustomerInput {
            email: Some("not-an-email".into()),
            ..CustomerInput::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Invalid email"));
        assert_eq!(errors[1], "Customer name is required");
    }

    #[test]
    fn test_address_requires_lines() {
        let errors = AddressInput {
            name: Some("Home".into()),
            zip_code: Some("150-0001".into()),
            ..AddressInput::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors,
            vec![
                "Prefecture is required",
                "City is required",
                "Address line 1 is required",
            ]
        );
    }

    #[test]
    fn test_address_defaults_to_not_default() {
        let address = AddressInput {
            name: Some("Home".into()),
            zip_code: Some("150-0001".into()),
            prefecture: Some("Tokyo".into()),
            city: Some("Shibuya".into()),
            address1: Some("1-2-3 Jingumae".into()),
            ..AddressInput::default()
        }
        .validate()
        .unwrap();
        assert!(!address.is_default);
        assert_eq!(address.address2, None);
    }
}
