// crafthub-checkout/src/reconciler/attempt.rs

//! State carried through one checkout attempt.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{event, Level};
use uuid::Uuid;

use crate::error::{CheckoutError, ErrorKind};
use crate::model::{CheckoutType, OrderLineItem, PaymentIntentHandle, PaymentMethod, PendingOrder};
use crate::money::Currency;

/// Stages of the checkout flow, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckoutStage {
  RequestIntent,
  AuthorizePayment,
  ConfirmOrder,
  CommitLocal,
}

impl CheckoutStage {
  pub const ALL: [CheckoutStage; 4] = [
    CheckoutStage::RequestIntent,
    CheckoutStage::AuthorizePayment,
    CheckoutStage::ConfirmOrder,
    CheckoutStage::CommitLocal,
  ];
}

/// Where an attempt stands.
///
/// ```text
/// Initiated -> IntentRequested -> GatewayAuthorizing -> GatewaySucceeded -> BackendConfirmed
///     |                                 |                     |
///     v                                 v                     v
/// IntentFailed                    GatewayFailed       BackendConfirmFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutState {
  Initiated,
  IntentRequested,
  GatewayAuthorizing,
  GatewaySucceeded,
  BackendConfirmed,
  IntentFailed,
  GatewayFailed,
  BackendConfirmFailed,
}

impl CheckoutState {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      CheckoutState::BackendConfirmed
        | CheckoutState::IntentFailed
        | CheckoutState::GatewayFailed
        | CheckoutState::BackendConfirmFailed
    )
  }

  pub fn is_success(self) -> bool {
    self == CheckoutState::BackendConfirmed
  }

  /// True once the buyer's money has moved.
  pub fn is_charged(self) -> bool {
    matches!(
      self,
      CheckoutState::GatewaySucceeded | CheckoutState::BackendConfirmed | CheckoutState::BackendConfirmFailed
    )
  }
}

impl fmt::Display for CheckoutState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(self, f)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
  pub from: CheckoutState,
  pub to: CheckoutState,
  pub at: DateTime<Utc>,
}

/// A failed attempt, in the shape shown to the buyer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFailure {
  pub kind: ErrorKind,
  pub message: String,
  /// Set when the buyer was charged; support needs it to find the payment.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_intent_id: Option<String>,
  pub retryable: bool,
}

impl From<&CheckoutError> for CheckoutFailure {
  fn from(err: &CheckoutError) -> Self {
    CheckoutFailure {
      kind: err.kind(),
      message: err.to_string(),
      payment_intent_id: err.payment_intent_id().map(str::to_string),
      retryable: err.is_retryable(),
    }
  }
}

/// Proof of a recorded order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
  pub order_key: Uuid,
  pub payment_intent_id: String,
  pub checkout_type: CheckoutType,
  pub amount_minor_units: i64,
  pub currency: Currency,
  pub items: Vec<OrderLineItem>,
  pub confirmed_booking_ids: Vec<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub backend_message: Option<String>,
  /// Cleanup that failed after the order was recorded.
  pub warnings: Vec<String>,
  /// The payment intent had already been committed by an earlier attempt;
  /// nothing was committed or announced again.
  pub duplicate: bool,
}

pub type SuccessCallback = Box<dyn FnOnce(&CheckoutReceipt) + Send + Sync>;

/// Flow state of one attempt.
pub struct CheckoutAttempt {
  pub order: PendingOrder,
  pub checkout_type: CheckoutType,
  pub payment_method: Option<PaymentMethod>,
  pub state: CheckoutState,
  pub history: Vec<Transition>,
  pub intent: Option<PaymentIntentHandle>,
  pub payment_intent_id: Option<String>,
  pub backend_message: Option<String>,
  pub receipt: Option<CheckoutReceipt>,
  pub failure: Option<CheckoutFailure>,
  pub(crate) on_success: Option<SuccessCallback>,
  /// Resumes a parked charge; the local cart may have changed since.
  pub(crate) resumed: bool,
}

impl CheckoutAttempt {
  pub fn new(order: PendingOrder, checkout_type: CheckoutType, payment_method: Option<PaymentMethod>) -> Self {
    Self {
      order,
      checkout_type,
      payment_method,
      state: CheckoutState::Initiated,
      history: Vec::new(),
      intent: None,
      payment_intent_id: None,
      backend_message: None,
      receipt: None,
      failure: None,
      on_success: None,
      resumed: false,
    }
  }

  pub fn transition(&mut self, to: CheckoutState) {
    let from = self.state;
    event!(
      Level::INFO,
      order_key = %self.order.order_key,
      checkout_type = %self.checkout_type,
      payment_intent_id = self.payment_intent_id.as_deref().unwrap_or(""),
      %from,
      %to,
      "Checkout state transition."
    );
    self.history.push(Transition { from, to, at: Utc::now() });
    self.state = to;
  }

  /// Moves to a failure state and records why.
  pub fn fail(&mut self, to: CheckoutState, err: &CheckoutError) {
    if err.kind() == ErrorKind::BackendConfirmFailedAfterCharge {
      event!(Level::ERROR, order_key = %self.order.order_key, error = %err, "Buyer charged but order not recorded.");
    } else {
      event!(Level::WARN, order_key = %self.order.order_key, error = %err, "Checkout attempt failed.");
    }
    self.failure = Some(CheckoutFailure::from(err));
    self.transition(to);
  }
}

impl fmt::Debug for CheckoutAttempt {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CheckoutAttempt")
      .field("order_key", &self.order.order_key)
      .field("checkout_type", &self.checkout_type)
      .field("state", &self.state)
      .field("payment_intent_id", &self.payment_intent_id)
      .field("has_success_callback", &self.on_success.is_some())
      .field("resumed", &self.resumed)
      .finish_non_exhaustive()
  }
}

/// Outcome of `submit` or `retry_confirmation`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReport {
  pub order_key: Uuid,
  pub checkout_type: CheckoutType,
  pub state: CheckoutState,
  pub history: Vec<Transition>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_intent_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub receipt: Option<CheckoutReceipt>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure: Option<CheckoutFailure>,
}

impl CheckoutReport {
  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn visited(&self, state: CheckoutState) -> bool {
    self.history.iter().any(|t| t.to == state)
  }
}

impl From<&CheckoutAttempt> for CheckoutReport {
  fn from(attempt: &CheckoutAttempt) -> Self {
    CheckoutReport {
      order_key: attempt.order.order_key,
      checkout_type: attempt.checkout_type,
      state: attempt.state,
      history: attempt.history.clone(),
      payment_intent_id: attempt.payment_intent_id.clone(),
      receipt: attempt.receipt.clone(),
      failure: attempt.failure.clone(),
    }
  }
}
