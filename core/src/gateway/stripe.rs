// crafthub-checkout/src/gateway/stripe.rs

//! Stripe payment intent confirmation over the public API, authenticated with
//! the publishable key and the intent's client secret.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{event, instrument, Level};

use super::{GatewayConfirmation, IntentStatus, PaymentGateway};
use crate::error::{CheckoutError, CheckoutResult};
use crate::model::{intent_id_from_client_secret, PaymentMethod};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct StripeConfig {
  pub publishable_key: String,
  pub api_base: String,
  pub timeout: Duration,
}

impl StripeConfig {
  pub fn new(publishable_key: impl Into<String>) -> Self {
    Self {
      publishable_key: publishable_key.into(),
      api_base: DEFAULT_API_BASE.to_string(),
      timeout: Duration::from_secs(60),
    }
  }
}

#[derive(Debug, Clone)]
pub struct StripeGateway {
  config: StripeConfig,
  client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
  id: String,
  status: IntentStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  code: Option<String>,
}

impl StripeGateway {
  pub fn new(config: StripeConfig) -> CheckoutResult<Self> {
    let client = reqwest::Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| CheckoutError::Config(format!("Failed to build gateway HTTP client: {}", e)))?;
    Ok(Self { config, client })
  }

  fn confirm_url(&self, payment_intent_id: &str) -> String {
    format!(
      "{}/v1/payment_intents/{}/confirm",
      self.config.api_base.trim_end_matches('/'),
      payment_intent_id
    )
  }
}

fn transport_error(err: reqwest::Error) -> CheckoutError {
  if err.is_timeout() {
    CheckoutError::Timeout {
      operation: "gateway authorization",
    }
  } else {
    CheckoutError::Network {
      operation: "gateway authorization",
      message: err.to_string(),
    }
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  #[instrument(name = "StripeGateway::confirm_card_payment", skip_all, fields(payment_method = %payment_method.id()))]
  async fn confirm_card_payment(&self, client_secret: &str, payment_method: &PaymentMethod) -> CheckoutResult<GatewayConfirmation> {
    let payment_intent_id = intent_id_from_client_secret(client_secret)
      .ok_or_else(|| CheckoutError::BackendValidation("Client secret does not name a payment intent".to_string()))?;

    let params = [("client_secret", client_secret), ("payment_method", payment_method.id())];
    let response = self
      .client
      .post(self.confirm_url(payment_intent_id))
      .basic_auth(&self.config.publishable_key, Some(""))
      .form(&params)
      .send()
      .await
      .map_err(transport_error)?;

    let status = response.status();
    if status.is_success() {
      let intent: IntentResponse = response.json().await.map_err(transport_error)?;
      event!(Level::INFO, payment_intent_id = %intent.id, status = ?intent.status, "Gateway confirmation answered.");
      return Ok(GatewayConfirmation {
        payment_intent_id: intent.id,
        status: intent.status,
      });
    }

    if status.is_server_error() {
      let message = response.text().await.unwrap_or_default();
      return Err(CheckoutError::Network {
        operation: "gateway authorization",
        message: format!("{}: {}", status, message),
      });
    }

    let envelope: Option<ErrorEnvelope> = response.json().await.ok();
    let (message, code) = match envelope {
      Some(ErrorEnvelope { error }) => (error.message, error.code),
      None => (None, None),
    };
    event!(Level::WARN, %payment_intent_id, status = status.as_u16(), code = ?code, "Gateway declined the payment.");
    Err(CheckoutError::GatewayRejected(
      message.unwrap_or_else(|| format!("Payment declined ({})", status)),
    ))
  }
}
