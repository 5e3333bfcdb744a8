//! Service configuration, read from the environment (after `.env` is loaded).

use std::env;
use thiserror::Error;

use crate::payment::razorpay::DEFAULT_BASE_URL;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Without a database the service runs on in-memory collections.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub nats_url: Option<String>,
    pub currency: String,
    pub razorpay_base_url: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    /// The only account allowed to call the user-count aggregation.
    pub user_count_admin_email: Option<String>,
    /// `College:CampusA|CampusB;...`
    pub multi_campus_colleges: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8083,
            database_url: None,
            db_max_connections: 10,
            nats_url: None,
            currency: "INR".to_string(),
            razorpay_base_url: DEFAULT_BASE_URL.to_string(),
            razorpay_key_id: String::new(),
            razorpay_key_secret: String::new(),
            razorpay_webhook_secret: String::new(),
            user_count_admin_email: None,
            multi_campus_colleges: String::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: parse_var("PORT", defaults.port)?,
            database_url: optional("DATABASE_URL"),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            nats_url: optional("NATS_URL"),
            currency: optional("CURRENCY").map(|c| c.to_uppercase()).unwrap_or(defaults.currency),
            razorpay_base_url: optional("RAZORPAY_BASE_URL").unwrap_or(defaults.razorpay_base_url),
            razorpay_key_id: optional("RAZORPAY_KEY_ID").unwrap_or_default(),
            razorpay_key_secret: optional("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            razorpay_webhook_secret: optional("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default(),
            user_count_admin_email: optional("USER_COUNT_ADMIN_EMAIL").map(|e| e.to_lowercase()),
            multi_campus_colleges: optional("MULTI_CAMPUS_COLLEGES").unwrap_or_default(),
        })
    }

    pub fn gateway_configured(&self) -> bool {
        !self.razorpay_key_id.is_empty() && !self.razorpay_key_secret.is_empty()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_defaults() {
        let c = AppConfig::default();
        assert_eq!(c.port, 8083);
        assert_eq!(c.currency, "INR");
        assert!(!c.gateway_configured());
    }
    #[test]
    fn test_parse_var_invalid() {
        env::set_var("CAMPUS_STOREFRONT_TEST_PORT", "eighty");
        let err = parse_var::<u16>("CAMPUS_STOREFRONT_TEST_PORT", 1).unwrap_err();
        assert!(err.to_string().contains("eighty"));
        env::remove_var("CAMPUS_STOREFRONT_TEST_PORT");
        assert_eq!(parse_var::<u16>("CAMPUS_STOREFRONT_TEST_PORT", 7).unwrap(), 7);
    }
}
