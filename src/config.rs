//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_URL` - `PostgreSQL` connection string; unset runs on the in-memory store
//! - `DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `NATS_URL` - NATS server; domain events are published when set
//! - `NATS_SUBJECT_PREFIX` - Subject prefix for events (default: storefront)
//! - `PREORDER_DEPOSIT_RATIO` - Share of pre-order item totals due up front, 0 to 1 (default: 0.50)
//! - `DEFAULT_DELIVERY_ZONE` - Shipping zone used when the address names none (default: inside_dhaka)
//! - `MAX_CART_QUANTITY` - Upper bound for one cart line (default: 50)
//! - `REQUEST_TIMEOUT_SECS` - Request deadline (default: 15)
//! - `STOCK_CACHE_TTL_SECS` - Product stock cache TTL (default: 300)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Business knobs consumed by the cart and checkout services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommerceSettings {
    pub preorder_deposit_ratio: Decimal,
    pub default_delivery_zone: String,
    pub max_cart_quantity: u32,
}

impl Default for CommerceSettings {
    fn default() -> Self {
        Self {
            preorder_deposit_ratio: Decimal::new(50, 2),
            default_delivery_zone: "inside_dhaka".to_string(),
            max_cart_quantity: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub nats_url: Option<String>,
    pub nats_subject_prefix: String,
    pub commerce: CommerceSettings,
    pub request_timeout: Duration,
    pub stock_cache_ttl: Duration,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed or is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let deposit_ratio: Decimal = env.parse_or("PREORDER_DEPOSIT_RATIO", Decimal::new(50, 2))?;
        if deposit_ratio < Decimal::ZERO || deposit_ratio > Decimal::ONE {
            return Err(ConfigError::InvalidEnvVar(
                "PREORDER_DEPOSIT_RATIO".to_string(),
                format!("must be between 0 and 1 (got {deposit_ratio})"),
            ));
        }

        let max_cart_quantity: u32 = env.parse_or("MAX_CART_QUANTITY", 50)?;
        if max_cart_quantity == 0 || i32::try_from(max_cart_quantity).is_err() {
            return Err(ConfigError::InvalidEnvVar(
                "MAX_CART_QUANTITY".to_string(),
                format!("must be a positive 32-bit integer (got {max_cart_quantity})"),
            ));
        }

        Ok(Self {
            host: env.parse_or("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: env.parse_or("PORT", 8083)?,
            database_url: env.optional("DATABASE_URL"),
            db_max_connections: env.parse_or("DB_MAX_CONNECTIONS", 10)?,
            nats_url: env.optional("NATS_URL"),
            nats_subject_prefix: env.optional("NATS_SUBJECT_PREFIX").unwrap_or_else(|| "storefront".to_string()),
            commerce: CommerceSettings {
                preorder_deposit_ratio: deposit_ratio,
                default_delivery_zone: env
                    .optional("DEFAULT_DELIVERY_ZONE")
                    .unwrap_or_else(|| "inside_dhaka".to_string()),
                max_cart_quantity,
            },
            request_timeout: Duration::from_secs(env.parse_or("REQUEST_TIMEOUT_SECS", 15)?),
            stock_cache_ttl: Duration::from_secs(env.parse_or("STOCK_CACHE_TTL_SECS", 300)?),
        })
    }

    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Unset and blank values are treated the same.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8083");
        assert!(config.database_url.is_none());
        assert_eq!(config.commerce, CommerceSettings::default());
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.nats_subject_prefix, "storefront");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "9000"),
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("PREORDER_DEPOSIT_RATIO", "0.25"),
            ("DEFAULT_DELIVERY_ZONE", "outside_dhaka"),
            ("MAX_CART_QUANTITY", "10"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.commerce.preorder_deposit_ratio, Decimal::new(25, 2));
        assert_eq!(config.commerce.default_delivery_zone, "outside_dhaka");
        assert_eq!(config.commerce.max_cart_quantity, 10);
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("DATABASE_URL", "  "), ("PORT", "")]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.port, 8083);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(load(&[("PORT", "eighty")]), Err(ConfigError::InvalidEnvVar(k, _)) if k == "PORT"));
        assert!(matches!(
            load(&[("PREORDER_DEPOSIT_RATIO", "1.5")]),
            Err(ConfigError::InvalidEnvVar(k, _)) if k == "PREORDER_DEPOSIT_RATIO"
        ));
        assert!(matches!(
            load(&[("MAX_CART_QUANTITY", "0")]),
            Err(ConfigError::InvalidEnvVar(k, _)) if k == "MAX_CART_QUANTITY"
        ));
    }
}
