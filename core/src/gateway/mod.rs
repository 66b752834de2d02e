// crafthub-checkout/src/gateway/mod.rs

//! The third-party payment gateway.
//!
//! Only the confirmation half of the handshake lives here; intents are created
//! by the backend, which holds the secret key.

pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, CheckoutResult};
use crate::model::PaymentMethod;

pub use stripe::{StripeConfig, StripeGateway};

/// Payment intent statuses as the gateway reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
  RequiresPaymentMethod,
  RequiresConfirmation,
  RequiresAction,
  Processing,
  RequiresCapture,
  Canceled,
  Succeeded,
  #[serde(other)]
  Unknown,
}

/// What the gateway said about a confirmation attempt that it did not decline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfirmation {
  pub payment_intent_id: String,
  pub status: IntentStatus,
}

impl GatewayConfirmation {
  /// The intent id when the charge went through; any other status counts as a
  /// rejection for this attempt.
  pub fn into_succeeded(self) -> CheckoutResult<String> {
    match self.status {
      IntentStatus::Succeeded => Ok(self.payment_intent_id),
      IntentStatus::RequiresAction => Err(CheckoutError::GatewayRejected(
        "Additional authentication is required to complete this payment".to_string(),
      )),
      IntentStatus::Processing => Err(CheckoutError::GatewayRejected(
        "The payment is still processing; check its status before paying again".to_string(),
      )),
      other => Err(CheckoutError::GatewayRejected(format!(
        "Payment ended in status {:?}",
        other
      ))),
    }
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Confirms the intent behind `client_secret` with `payment_method`.
  ///
  /// A decline is `Err(GatewayRejected)` carrying the gateway's own message.
  async fn confirm_card_payment(&self, client_secret: &str, payment_method: &PaymentMethod) -> CheckoutResult<GatewayConfirmation>;
}
