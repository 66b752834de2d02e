// crafthub-checkout/src/intent.rs

//! Payment intent client.

use std::sync::Arc;
use std::time::Duration;
use tracing::{event, instrument, Level};

use crate::backend::{CheckoutBackend, CreatePaymentIntentRequest};
use crate::bounded::bounded;
use crate::error::{CheckoutError, CheckoutResult};
use crate::model::{CheckoutType, PaymentIntentHandle, PendingOrder};
use crate::money::Currency;

/// Checks everything that can be checked locally and returns the amount to
/// charge. Nothing here touches the network.
pub fn check_preconditions(order: &PendingOrder, checkout_type: CheckoutType) -> CheckoutResult<i64> {
  if order.is_empty() {
    return Err(CheckoutError::EmptyOrder);
  }
  let amount = order.total_minor_units()?;
  if amount <= 0 {
    return Err(CheckoutError::EmptyOrder);
  }
  if checkout_type == CheckoutType::Cart && !order.delivery_info.as_ref().is_some_and(|d| d.is_complete()) {
    return Err(CheckoutError::MissingDeliveryInfo);
  }
  Ok(amount)
}

/// Requests payment intents from the backend on behalf of a pending order.
#[derive(Clone)]
pub struct PaymentIntentClient {
  backend: Arc<dyn CheckoutBackend>,
  timeout: Duration,
}

impl PaymentIntentClient {
  pub fn new(backend: Arc<dyn CheckoutBackend>, timeout: Duration) -> Self {
    Self { backend, timeout }
  }

  /// Creates a single-use intent for `order`.
  ///
  /// Fails with `EmptyOrder` or `MissingDeliveryInfo` before any request is
  /// made. When the backend echoes amount or currency back, both must match
  /// the order.
  #[instrument(name = "PaymentIntentClient::request_intent", skip_all, fields(order_key = %order.order_key, checkout_type = %checkout_type))]
  pub async fn request_intent(&self, order: &PendingOrder, checkout_type: CheckoutType) -> CheckoutResult<PaymentIntentHandle> {
    let amount = check_preconditions(order, checkout_type)?;
    let request = CreatePaymentIntentRequest::for_order(order, checkout_type, amount);

    let response = bounded(
      "payment intent request",
      self.timeout,
      self.backend.create_payment_intent(&request),
    )
    .await?;

    if let Some(echoed) = response.amount_cents {
      if echoed != amount {
        return Err(CheckoutError::BackendValidation(format!(
          "Payment intent amount {} does not match order total {}",
          echoed, amount
        )));
      }
    }
    if let Some(echoed) = response.currency.as_deref() {
      let matches = Currency::new(echoed).is_ok_and(|c| c == order.currency);
      if !matches {
        return Err(CheckoutError::BackendValidation(format!(
          "Payment intent currency {} does not match order currency {}",
          echoed, order.currency
        )));
      }
    }

    event!(Level::INFO, amount_cents = amount, "Payment intent created.");
    Ok(PaymentIntentHandle {
      client_secret: response.client_secret,
      amount_minor_units: amount,
      currency: order.currency.clone(),
    })
  }
}
