use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub status: ProductStatus,
    pub is_membership: bool,
    pub stripe_price_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Product {
    pub fn is_bookable(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Price in cents, rounded half away from zero.
    pub fn unit_amount(&self) -> Option<i64> {
        (self.price * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    ComingSoon,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::ComingSoon => "coming_soon",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ProductStatus::Active),
            "coming_soon" => Some(ProductStatus::ComingSoon),
            _ => None,
        }
    }
}

/// Fields an admin supplies when creating or editing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default = "default_status")]
    pub status: ProductStatus,
    #[serde(default)]
    pub is_membership: bool,
    #[serde(default)]
    pub stripe_price_id: Option<String>,
}

impl ProductInput {
    pub fn check(&self) -> Result<(), ValidationError> {
        let name_len = self.name.trim().chars().count();
        if !(2..=100).contains(&name_len) {
            return Err(ValidationError::InvalidField {
                field: "name",
                message: "must be between 2 and 100 characters".to_string(),
            });
        }
        if self.price.is_sign_negative() {
            return Err(ValidationError::InvalidField {
                field: "price",
                message: "must not be negative".to_string(),
            });
        }
        if self.description.as_deref().is_some_and(|d| d.chars().count() > 500) {
            return Err(ValidationError::InvalidField {
                field: "description",
                message: "must be at most 500 characters".to_string(),
            });
        }
        if self.stripe_price_id.as_deref().is_some_and(|p| p.len() > 100) {
            return Err(ValidationError::InvalidField {
                field: "stripe_price_id",
                message: "must be at most 100 characters".to_string(),
            });
        }
        Ok(())
    }
}

fn default_status() -> ProductStatus {
    ProductStatus::Active
}

/// Normalizes a price to the two decimal places the catalog stores.
pub fn normalize_price(price: Decimal) -> Decimal {
    let mut price = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    price.rescale(2);
    price
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn product(price: &str) -> Product {
        Product {
            id: 1,
            name: "Premium Mobile Detail".to_string(),
            description: None,
            price: Decimal::from_str(price).unwrap(),
            status: ProductStatus::Active,
            is_membership: false,
            stripe_price_id: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_unit_amount_in_cents() {
        assert_eq!(product("75.00").unit_amount(), Some(7500));
        assert_eq!(product("299").unit_amount(), Some(29900));
        assert_eq!(product("19.995").unit_amount(), Some(2000));
    }

    #[test]
    fn test_normalize_price_keeps_two_places() {
        let price = normalize_price(Decimal::from_str("75").unwrap());
        assert_eq!(price.to_string(), "75.00");
        let price = normalize_price(Decimal::from_str("12.345").unwrap());
        assert_eq!(price.to_string(), "12.35");
    }

    #[test]
    fn test_product_input_checks() {
        let input = |name: &str, price: &str| ProductInput {
            name: name.to_string(),
            description: None,
            price: Decimal::from_str(price).unwrap(),
            status: ProductStatus::Active,
            is_membership: false,
            stripe_price_id: None,
        };
        assert!(input("Interior Detail", "45.00").check().is_ok());
        assert!(input("X", "45.00").check().is_err());
        assert!(input("Interior Detail", "-1").check().is_err());
    }

    #[test]
    fn test_coming_soon_is_not_bookable() {
        let mut p = product("120.00");
        assert!(p.is_bookable());
        p.status = ProductStatus::ComingSoon;
        assert!(!p.is_bookable());
    }
}
