use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use utoipa::ToSchema;
use uuid::Uuid;

/// Credit-purchase tier. `None` is the state of a freshly created account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "plan", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    None,
    Basic,
    Advanced,
    Premium,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::None => "none",
            Plan::Basic => "basic",
            Plan::Advanced => "advanced",
            Plan::Premium => "premium",
        }
    }

    pub fn is_purchasable(&self) -> bool {
        !matches!(self, Plan::None)
    }

    /// Total price in GBP pence for `qty` photo credits. Larger tiers get a
    /// cheaper per-photo rate once the quantity passes the tier threshold.
    pub fn price_minor(&self, qty: i32) -> Option<i64> {
        let qty = i64::from(qty);
        if qty < 1 {
            return None;
        }

        let price = match self {
            Plan::None => return None,
            Plan::Basic => qty * 699,
            Plan::Advanced if qty <= 5 => qty * 699,
            Plan::Advanced => 5 * 699 + (qty - 5) * 599,
            Plan::Premium if qty <= 10 => qty * 599,
            Plan::Premium => 10 * 599 + (qty - 10) * 499,
        };

        Some(price)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Plan::None),
            "basic" => Ok(Plan::Basic),
            "advanced" => Ok(Plan::Advanced),
            "premium" => Ok(Plan::Premium),
            other => Err(format!("Unknown plan: {}", other)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub plan: Plan,
    pub photo_credits: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub plan: Plan,
    pub photo_credits: i32,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            plan: user.plan,
            photo_credits: user.photo_credits,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreditsResponse {
    pub photo_credits: i32,
    pub plan: Plan,
}
