use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;

use super::{CheckoutItem, CheckoutSession, PaymentGateway};

/// Stripe refuses checkout sessions that expire sooner than this.
const MIN_SESSION_LIFETIME_MINUTES: i64 = 30;

pub struct StripeGateway {
    secret_key: String,
    api_base: String,
    session_lifetime: Duration,
    client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(
        secret_key: String,
        api_base: String,
        session_lifetime: Duration,
        timeout: std::time::Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Stripe HTTP client")?;
        Ok(Self {
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            session_lifetime,
            client,
        })
    }

    fn form_params(
        &self,
        item: &CheckoutItem,
        success_url: &str,
        cancel_url: &str,
    ) -> Vec<(String, String)> {
        let lifetime = self
            .session_lifetime
            .max(Duration::minutes(MIN_SESSION_LIFETIME_MINUTES));
        let expires_at = (Utc::now() + lifetime).timestamp();

        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), success_url.into()),
            ("cancel_url".into(), cancel_url.into()),
            ("automatic_tax[enabled]".into(), "true".into()),
            ("billing_address_collection".into(), "required".into()),
            ("customer_creation".into(), "always".into()),
            ("expires_at".into(), expires_at.to_string()),
            ("line_items[0][quantity]".into(), "1".into()),
        ];

        match item {
            CheckoutItem::StoredPrice { price_id } => {
                params.push(("line_items[0][price]".into(), price_id.clone()));
            }
            CheckoutItem::AdHoc {
                currency,
                name,
                description,
                unit_amount,
            } => {
                let prefix = "line_items[0][price_data]";
                params.push((format!("{prefix}[currency]"), currency.clone()));
                params.push((format!("{prefix}[unit_amount]"), unit_amount.to_string()));
                params.push((format!("{prefix}[product_data][name]"), name.clone()));
                if let Some(description) = description.as_deref().filter(|d| !d.is_empty()) {
                    params.push((
                        format!("{prefix}[product_data][description]"),
                        description.to_string(),
                    ));
                }
            }
        }
        params
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout(
        &self,
        item: &CheckoutItem,
        success_url: &str,
        cancel_url: &str,
    ) -> anyhow::Result<CheckoutSession> {
        anyhow::ensure!(
            !self.secret_key.is_empty(),
            "Stripe API key is not configured. Set STRIPE_SECRET_KEY in your environment."
        );

        let resp = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&self.form_params(item, success_url, cancel_url))
            .send()
            .await
            .context("failed to call Stripe API")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Stripe API error ({status}): {body}");
        }

        let session: SessionResponse = resp
            .json()
            .await
            .context("failed to parse Stripe checkout session")?;
        let url = session
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe checkout session {} has no url", session.id))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(secret_key: &str) -> StripeGateway {
        StripeGateway::new(
            secret_key.to_string(),
            "https://api.stripe.com/".to_string(),
            Duration::minutes(10),
            std::time::Duration::from_secs(5),
        )
        .unwrap()
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_ad_hoc_line_item() {
        let item = CheckoutItem::AdHoc {
            currency: "usd".to_string(),
            name: "Premium Mobile Detail".to_string(),
            description: None,
            unit_amount: 7500,
        };
        let params = gateway("sk_test").form_params(&item, "https://s", "https://c");

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(param(&params, "line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(param(&params, "line_items[0][price_data][unit_amount]"), Some("7500"));
        assert_eq!(
            param(&params, "line_items[0][price_data][product_data][name]"),
            Some("Premium Mobile Detail")
        );
        assert_eq!(param(&params, "line_items[0][price_data][product_data][description]"), None);
        assert_eq!(param(&params, "line_items[0][price]"), None);
        assert_eq!(param(&params, "success_url"), Some("https://s"));
    }

    #[test]
    fn test_stored_price_line_item() {
        let item = CheckoutItem::StoredPrice {
            price_id: "price_123".to_string(),
        };
        let params = gateway("sk_test").form_params(&item, "https://s", "https://c");
        assert_eq!(param(&params, "line_items[0][price]"), Some("price_123"));
        assert_eq!(param(&params, "line_items[0][quantity]"), Some("1"));
    }

    #[test]
    fn test_expiry_respects_minimum_lifetime() {
        let item = CheckoutItem::StoredPrice {
            price_id: "price_123".to_string(),
        };
        let params = gateway("sk_test").form_params(&item, "https://s", "https://c");
        let expires_at: i64 = param(&params, "expires_at").unwrap().parse().unwrap();
        let floor = Utc::now().timestamp() + MIN_SESSION_LIFETIME_MINUTES * 60 - 5;
        assert!(expires_at >= floor);
    }

    #[tokio::test]
    async fn test_missing_key_is_an_error() {
        let item = CheckoutItem::StoredPrice {
            price_id: "price_123".to_string(),
        };
        let err = gateway("")
            .create_checkout(&item, "https://s", "https://c")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("STRIPE_SECRET_KEY"));
    }
}
