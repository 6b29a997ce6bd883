use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{AppError, Result};

const CURRENCY: &str = "GBP";

/// Server-side confirmation that a checkout order was actually paid.
#[async_trait]
pub trait OrderVerifier: Send + Sync {
    /// Succeeds only if `order_id` is completed and paid `expected_minor`
    /// pence.
    async fn verify_order(&self, order_id: &str, expected_minor: i64) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Amount {
    currency_code: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct PurchaseUnit {
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct Order {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

pub struct PayPalClient {
    client: Client,
    api_base: String,
    client_id: String,
    secret: String,
}

impl PayPalClient {
    pub fn new(api_base: &str, client_id: &str, secret: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.api_base))
            .basic_auth(&self.client_id, Some(&self.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::error!("PayPal token request returned {}", response.status());
            return Err(AppError::Internal(anyhow::anyhow!(
                "PayPal authentication failed with {}",
                response.status()
            )));
        }

        Ok(response.json::<AccessToken>().await?.access_token)
    }

    /// The order id is pushed as a single percent-encoded segment, so `?`,
    /// `#` or `/` in it cannot reach a different resource.
    fn order_url(&self, order_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid PayPal API base: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("invalid PayPal API base")))?
            .pop_if_empty()
            .extend(["v2", "checkout", "orders", order_id]);
        Ok(url)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<Order> {
        let url = self.order_url(order_id)?;
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<Order>().await?),
            StatusCode::NOT_FOUND => Err(AppError::PaymentUnverified(format!(
                "order {} does not exist",
                order_id
            ))),
            status => Err(AppError::Internal(anyhow::anyhow!(
                "PayPal order lookup returned {}",
                status
            ))),
        }
    }
}

#[async_trait]
impl OrderVerifier for PayPalClient {
    async fn verify_order(&self, order_id: &str, expected_minor: i64) -> Result<()> {
        let order = self.fetch_order(order_id).await?;

        if order.id != order_id {
            return Err(AppError::PaymentUnverified(format!(
                "PayPal answered with order {} for {}",
                order.id, order_id
            )));
        }

        if order.status != "COMPLETED" {
            return Err(AppError::PaymentUnverified(format!(
                "order {} has status {}",
                order.id, order.status
            )));
        }

        let mut paid = 0i64;
        for unit in &order.purchase_units {
            if unit.amount.currency_code != CURRENCY {
                return Err(AppError::PaymentUnverified(format!(
                    "order {} paid in {}",
                    order.id, unit.amount.currency_code
                )));
            }
            paid += parse_minor_units(&unit.amount.value).ok_or_else(|| {
                AppError::PaymentUnverified(format!("unreadable amount {}", unit.amount.value))
            })?;
        }

        if paid != expected_minor {
            return Err(AppError::PaymentUnverified(format!(
                "order {} paid {} pence, expected {}",
                order.id, paid, expected_minor
            )));
        }

        tracing::info!(order_id = %order.id, amount_minor = paid, "PayPal order verified");
        Ok(())
    }
}

/// `"34.95"` -> 3495. At most two decimal places.
pub fn parse_minor_units(value: &str) -> Option<i64> {
    let value = value.trim();
    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    if whole.is_empty() || fraction.len() > 2 || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let whole: i64 = whole.parse().ok()?;
    let fraction: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };

    whole.checked_mul(100)?.checked_add(fraction)
}
