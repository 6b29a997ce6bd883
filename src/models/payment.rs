use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PayPalMode {
    Sandbox,
    Live,
}

impl PayPalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayPalMode::Sandbox => "sandbox",
            PayPalMode::Live => "live",
        }
    }

    pub fn api_base(&self) -> &'static str {
        match self {
            PayPalMode::Sandbox => "https://api-m.sandbox.paypal.com",
            PayPalMode::Live => "https://api-m.paypal.com",
        }
    }
}

impl FromStr for PayPalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Ok(PayPalMode::Sandbox),
            "live" => Ok(PayPalMode::Live),
            other => Err(format!("Unknown PayPal mode: {}", other)),
        }
    }
}

/// Quantity as sent by the checkout client: either a JSON number or a
/// numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(f64),
    Text(String),
}

impl Quantity {
    /// Leading-integer parse: `"5 photos"` is 5, `"abc"` is `None`.
    pub fn parse(&self) -> Option<i64> {
        match self {
            Quantity::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Quantity::Number(_) => None,
            Quantity::Text(s) => {
                let s = s.trim();
                let (sign, digits) = match s.strip_prefix('-') {
                    Some(rest) => (-1, rest),
                    None => (1, s.strip_prefix('+').unwrap_or(s)),
                };
                let end = digits
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(digits.len());
                digits[..end].parse::<i64>().ok().map(|n| sign * n)
            }
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentSuccessRequest {
    pub plan: Option<String>,
    #[serde(rename = "orderID")]
    pub order_id: Option<String>,
    #[serde(rename = "payerID")]
    pub payer_id: Option<String>,
    #[schema(value_type = Option<i32>)]
    pub qty: Option<Quantity>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentSuccessResponse {
    pub msg: String,
    pub plan: Plan,
    pub photo_credits: i32,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub plan: Plan,
    pub order_id: String,
    pub payer_id: String,
    pub quantity: i32,
    pub amount_minor: i64,
    pub verified: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: Plan,
    pub order_id: String,
    pub payer_id: String,
    pub quantity: i32,
    pub amount_minor: i64,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClientIdQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClientIdResponse {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub mode: PayPalMode,
    #[serde(rename = "isLive")]
    pub is_live: bool,
}
