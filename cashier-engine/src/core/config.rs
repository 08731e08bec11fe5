use crate::checkout::StaticPasswordAuthorizer;
use crate::money::{PricingConfig, ServiceFeeConfig, TaxConfig};
use rust_decimal::Decimal;
use shared::order::OrderType;
use std::time::Duration;

/// Engine configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | API_BASE_URL | http://localhost:3000 | Remote order API |
/// | API_TOKEN | - | Bearer token sent with every request |
/// | REQUEST_TIMEOUT_SECS | 30 | Remote request timeout |
/// | TAX_MODE | percentage | `percentage` or `itemized` |
/// | TAX_RATE | 0 | Tax percentage of the subtotal |
/// | SERVICE_FEE_RATE | 0 | Service fee percentage of the subtotal |
/// | SERVICE_FEE_ORDER_TYPES | dine_in | Comma separated order types charged the fee |
/// | LOG_LEVEL | info | Log level |
/// | LOG_JSON | false | JSON log output |
/// | LOG_DIR | - | Directory for rolling log files |
/// | MANAGER_PASSWORD_SHA256 | - | Hex SHA-256 of the free discount password |
///
/// # Example
///
/// ```ignore
/// API_BASE_URL=https://pos.example.com TAX_RATE=14 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub pricing: PricingConfig,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub manager_password_sha256: Option<String>,
}

impl EngineConfig {
    /// Load `.env` (if present), then read the environment
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or unparsable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let tax_rate: Decimal = non_empty("TAX_RATE")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let tax = match non_empty("TAX_MODE").as_deref() {
            Some("itemized") => TaxConfig::Itemized,
            _ => TaxConfig::Percentage { rate: tax_rate },
        };

        let service_fee = ServiceFeeConfig {
            rate: non_empty("SERVICE_FEE_RATE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            order_types: non_empty("SERVICE_FEE_ORDER_TYPES")
                .map(|v| parse_order_types(&v))
                .unwrap_or_else(|| vec![OrderType::DineIn]),
        };

        Self {
            api_base_url: non_empty("API_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".into()),
            api_token: non_empty("API_TOKEN"),
            request_timeout_secs: non_empty("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            pricing: PricingConfig { tax, service_fee },
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: non_empty("LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: non_empty("LOG_DIR"),
            manager_password_sha256: non_empty("MANAGER_PASSWORD_SHA256"),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Free discount authorizer, if a manager password is configured
    pub fn authorizer(&self) -> Option<StaticPasswordAuthorizer> {
        self.manager_password_sha256
            .as_deref()
            .map(StaticPasswordAuthorizer::from_digest)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_order_types(value: &str) -> Vec<OrderType> {
    value
        .split(',')
        .filter_map(|t| match t.trim() {
            "dine_in" => Some(OrderType::DineIn),
            "take_away" => Some(OrderType::TakeAway),
            "delivery" => Some(OrderType::Delivery),
            other => {
                tracing::warn!(order_type = other, "Ignoring unknown order type in SERVICE_FEE_ORDER_TYPES");
                None
            }
        })
        .collect()
}
