// checkout_service/src/config.rs

use crate::errors::{AppError, Result};
use crafthub_checkout::{CheckoutSettings, Currency, ExpiryPolicy};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  // REST backend holding carts, bookings and orders
  pub backend_base_url: String,
  pub backend_token: String,

  pub stripe_publishable_key: String,
  pub stripe_api_base: String,

  pub currency: Currency,
  pub gateway_timeout: Duration,
  pub backend_timeout: Duration,
  pub refresh_interval: Duration,
  pub expiry_policy: ExpiryPolicy,
}

fn parse_secs(var_name: &str, raw: Option<String>, default: u64) -> Result<Duration> {
  match raw {
    None => Ok(Duration::from_secs(default)),
    Some(value) => value
      .parse::<u64>()
      .map(Duration::from_secs)
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let require =
      |var_name: &str| lookup(var_name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)));

    let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = lookup("SERVER_PORT")
      .unwrap_or_else(|| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let backend_base_url = require("BACKEND_BASE_URL")?;
    let backend_token = require("BACKEND_TOKEN")?;
    let stripe_publishable_key = require("STRIPE_PUBLISHABLE_KEY")?;
    let stripe_api_base =
      lookup("STRIPE_API_BASE").unwrap_or_else(|| crafthub_checkout::gateway::stripe::DEFAULT_API_BASE.to_string());

    let currency = Currency::new(&lookup("CHECKOUT_CURRENCY").unwrap_or_else(|| "EUR".to_string()))?;
    let gateway_timeout = parse_secs("GATEWAY_TIMEOUT_SECS", lookup("GATEWAY_TIMEOUT_SECS"), 60)?;
    let backend_timeout = parse_secs("BACKEND_TIMEOUT_SECS", lookup("BACKEND_TIMEOUT_SECS"), 15)?;
    let refresh_interval = parse_secs("REFRESH_INTERVAL_SECS", lookup("REFRESH_INTERVAL_SECS"), 15)?;
    let expiry_policy = match lookup("EXPIRY_POLICY") {
      Some(raw) => raw.parse::<ExpiryPolicy>()?,
      None => ExpiryPolicy::default(),
    };

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      backend_base_url,
      backend_token,
      stripe_publishable_key,
      stripe_api_base,
      currency,
      gateway_timeout,
      backend_timeout,
      refresh_interval,
      expiry_policy,
    })
  }

  pub fn checkout_settings(&self) -> CheckoutSettings {
    CheckoutSettings {
      currency: self.currency.clone(),
      gateway_timeout: self.gateway_timeout,
      backend_timeout: self.backend_timeout,
      refresh_interval: self.refresh_interval,
      expiry_policy: self.expiry_policy,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  fn required() -> Vec<(&'static str, &'static str)> {
    vec![
      ("BACKEND_BASE_URL", "http://localhost:5000/api"),
      ("BACKEND_TOKEN", "token"),
      ("STRIPE_PUBLISHABLE_KEY", "pk_test_123"),
    ]
  }

  #[test]
  fn defaults_apply_when_only_required_vars_are_set() {
    let env = vars(&required());
    let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

    assert_eq!(config.server_port, 8080);
    assert_eq!(config.currency.code(), "EUR");
    assert_eq!(config.gateway_timeout, Duration::from_secs(60));
    assert_eq!(config.backend_timeout, Duration::from_secs(15));
    assert_eq!(config.expiry_policy, ExpiryPolicy::Instant);
  }

  #[test]
  fn missing_backend_url_is_a_config_error() {
    let env = vars(&[("BACKEND_TOKEN", "t"), ("STRIPE_PUBLISHABLE_KEY", "pk")]);
    let err = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();
    assert!(matches!(err, AppError::Config(ref m) if m.contains("BACKEND_BASE_URL")));
  }

  #[test]
  fn overrides_are_parsed() {
    let mut pairs = required();
    pairs.extend([
      ("CHECKOUT_CURRENCY", "tnd"),
      ("EXPIRY_POLICY", "calendar_day"),
      ("REFRESH_INTERVAL_SECS", "30"),
    ]);
    let env = vars(&pairs);
    let config = AppConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

    assert_eq!(config.currency.code(), "TND");
    assert_eq!(config.expiry_policy, ExpiryPolicy::CalendarDay);
    assert_eq!(config.checkout_settings().refresh_interval, Duration::from_secs(30));
  }
}
