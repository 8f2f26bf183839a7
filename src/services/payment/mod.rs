pub mod stripe;

use async_trait::async_trait;

use crate::models::Product;

/// What the customer is charged for: either a price already configured at
/// the processor, or a one-off price built from the product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutItem {
    StoredPrice {
        price_id: String,
    },
    AdHoc {
        currency: String,
        name: String,
        description: Option<String>,
        unit_amount: i64,
    },
}

impl CheckoutItem {
    pub fn for_product(product: &Product) -> anyhow::Result<Self> {
        if let Some(price_id) = product.stripe_price_id.as_deref().filter(|p| !p.is_empty()) {
            return Ok(CheckoutItem::StoredPrice {
                price_id: price_id.to_string(),
            });
        }

        let unit_amount = product
            .unit_amount()
            .ok_or_else(|| anyhow::anyhow!("price out of range for product {}", product.id))?;
        Ok(CheckoutItem::AdHoc {
            currency: "usd".to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            unit_amount,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(
        &self,
        item: &CheckoutItem,
        success_url: &str,
        cancel_url: &str,
    ) -> anyhow::Result<CheckoutSession>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductStatus;
    use rust_decimal::Decimal;

    fn product(price: Decimal, stripe_price_id: Option<&str>) -> Product {
        Product {
            id: 1,
            name: "Premium Mobile Detail".to_string(),
            description: Some("Wash and wax".to_string()),
            price,
            status: ProductStatus::Active,
            is_membership: false,
            stripe_price_id: stripe_price_id.map(str::to_string),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_ad_hoc_price_in_cents() {
        let item = CheckoutItem::for_product(&product(Decimal::new(7500, 2), None)).unwrap();
        assert_eq!(
            item,
            CheckoutItem::AdHoc {
                currency: "usd".to_string(),
                name: "Premium Mobile Detail".to_string(),
                description: Some("Wash and wax".to_string()),
                unit_amount: 7500,
            }
        );
    }

    #[test]
    fn test_stored_price_is_preferred() {
        let item =
            CheckoutItem::for_product(&product(Decimal::new(7500, 2), Some("price_123"))).unwrap();
        assert_eq!(
            item,
            CheckoutItem::StoredPrice {
                price_id: "price_123".to_string()
            }
        );
    }

    #[test]
    fn test_blank_stored_price_falls_back_to_ad_hoc() {
        let item = CheckoutItem::for_product(&product(Decimal::new(29900, 2), Some(""))).unwrap();
        assert!(matches!(item, CheckoutItem::AdHoc { unit_amount: 29900, .. }));
    }
}
