use anyhow::Result;
use serde::Deserialize;
use std::env;

use crate::models::PayPalMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub upload_dir: String,
    pub public_base_url: String,
    pub max_file_size: usize,
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub paypal: PayPalConfig,
    pub replicate: ReplicateConfig,
    pub persist_restored: bool,
    pub refund_failed_restores: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayPalConfig {
    pub default_mode: PayPalMode,
    pub sandbox_client_id: Option<String>,
    pub sandbox_secret: Option<String>,
    pub live_client_id: Option<String>,
    pub live_secret: Option<String>,
}

impl PayPalConfig {
    pub fn client_id(&self, mode: PayPalMode) -> Option<&str> {
        match mode {
            PayPalMode::Sandbox => self.sandbox_client_id.as_deref(),
            PayPalMode::Live => self.live_client_id.as_deref(),
        }
    }

    /// Credentials for server-side order checks in the default mode, if both
    /// halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let secret = match self.default_mode {
            PayPalMode::Sandbox => self.sandbox_secret.as_deref(),
            PayPalMode::Live => self.live_secret.as_deref(),
        };
        Some((self.client_id(self.default_mode)?, secret?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub api_base: String,
    pub model: String,
    pub poll_interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "postgresql://localhost/photo_restore".to_string(),
            db_max_connections: 10,
            port: 5000,
            upload_dir: "./uploads".to_string(),
            public_base_url: "http://localhost:5000".to_string(),
            max_file_size: 10 * 1024 * 1024,
            jwt_secret: "dev-secret-key-change-in-production".to_string(),
            jwt_expiry_hours: 24,
            paypal: PayPalConfig {
                default_mode: PayPalMode::Sandbox,
                sandbox_client_id: None,
                sandbox_secret: None,
                live_client_id: None,
                live_secret: None,
            },
            replicate: ReplicateConfig {
                api_token: None,
                api_base: "https://api.replicate.com/v1".to_string(),
                model: "flux-kontext-apps/restore-image".to_string(),
                poll_interval_ms: 1000,
                timeout_secs: 120,
            },
            persist_restored: true,
            refund_failed_restores: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let port: u16 = env::var("PORT")
            .unwrap_or_else(|_| defaults.port.to_string())
            .parse()?;

        Ok(Config {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            port,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or(defaults.upload_dir),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            max_file_size: env::var("MAX_FILE_SIZE")
                .unwrap_or_else(|_| "10485760".to_string()) // 10MB
                .parse()?,
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            paypal: PayPalConfig {
                default_mode: env::var("PAYPAL_MODE")
                    .ok()
                    .and_then(|mode| mode.parse().ok())
                    .unwrap_or(PayPalMode::Sandbox),
                sandbox_client_id: non_empty_var("PAYPAL_CLIENT_ID"),
                sandbox_secret: non_empty_var("PAYPAL_SECRET"),
                live_client_id: non_empty_var("PAYPAL_LIVE_CLIENT_ID"),
                live_secret: non_empty_var("PAYPAL_LIVE_SECRET"),
            },
            replicate: ReplicateConfig {
                api_token: non_empty_var("REPLICATE_API_TOKEN"),
                api_base: env::var("REPLICATE_API_BASE").unwrap_or(defaults.replicate.api_base),
                model: env::var("REPLICATE_MODEL").unwrap_or(defaults.replicate.model),
                poll_interval_ms: env::var("REPLICATE_POLL_INTERVAL_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()?,
                timeout_secs: env::var("REPLICATE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()?,
            },
            persist_restored: env::var("PERSIST_RESTORED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
            refund_failed_restores: env::var("REFUND_FAILED_RESTORES")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}
