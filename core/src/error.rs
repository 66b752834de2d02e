// crafthub-checkout/src/error.rs
use anyhow::Error as AnyhowError;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the step-flow engine itself, independent of what the
/// flow is doing. Checkout code converts these into `CheckoutError::Flow`.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Stage '{stage}' of flow '{flow}' has no handlers")]
  HandlerMissing { flow: &'static str, stage: String },

  #[error("Flow handler failed. Source: {source}")]
  HandlerFailure {
    #[source]
    source: AnyhowError,
  },
}

/// The checkout failure taxonomy.
///
/// Every failure of a checkout attempt ends up as one of these, and every one
/// of these maps onto a stable [`ErrorKind`] that the UI layer can switch on.
#[derive(Debug, Error)]
pub enum CheckoutError {
  #[error("Invalid amount: {0}")]
  InvalidAmount(String),

  #[error("Invalid currency code: {0}")]
  InvalidCurrency(String),

  #[error("The order has no payable items")]
  EmptyOrder,

  #[error("Delivery information is required for a cart checkout")]
  MissingDeliveryInfo,

  #[error("Network error during {operation}: {message}")]
  Network { operation: &'static str, message: String },

  #[error("Payment was declined: {0}")]
  GatewayRejected(String),

  #[error("The backend rejected the request: {0}")]
  BackendValidation(String),

  /// The buyer has been charged but the backend never acknowledged the order.
  /// Never retried silently; the payment intent id is what support needs.
  #[error("Payment {payment_intent_id} succeeded but the order was not recorded: {reason}")]
  BackendConfirmFailedAfterCharge { payment_intent_id: String, reason: String },

  #[error("Timed out during {operation}; the outcome is unknown, check before retrying")]
  Timeout { operation: &'static str },

  #[error("A checkout for order {order_key} is already in flight")]
  AttemptInFlight { order_key: uuid::Uuid },

  /// The order was charged earlier and that charge is still unrecorded.
  #[error("Order already charged by payment {payment_intent_id}; retry or acknowledge that charge first")]
  UnresolvedChargePending { payment_intent_id: String },

  #[error("No unresolved charge is recorded for payment intent {0}")]
  UnknownCharge(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Checkout flow error: {source}")]
  Flow {
    #[from]
    source: FlowError,
  },
}

/// Stable, serializable classification of a [`CheckoutError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
  InvalidAmount,
  InvalidCurrency,
  EmptyOrder,
  MissingDeliveryInfo,
  NetworkError,
  GatewayRejected,
  BackendValidationError,
  BackendConfirmFailedAfterCharge,
  TimeoutError,
  AttemptInFlight,
  UnresolvedChargePending,
  UnknownCharge,
  Config,
  Internal,
}

impl CheckoutError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      CheckoutError::InvalidAmount(_) => ErrorKind::InvalidAmount,
      CheckoutError::InvalidCurrency(_) => ErrorKind::InvalidCurrency,
      CheckoutError::EmptyOrder => ErrorKind::EmptyOrder,
      CheckoutError::MissingDeliveryInfo => ErrorKind::MissingDeliveryInfo,
      CheckoutError::Network { .. } => ErrorKind::NetworkError,
      CheckoutError::GatewayRejected(_) => ErrorKind::GatewayRejected,
      CheckoutError::BackendValidation(_) => ErrorKind::BackendValidationError,
      CheckoutError::BackendConfirmFailedAfterCharge { .. } => ErrorKind::BackendConfirmFailedAfterCharge,
      CheckoutError::Timeout { .. } => ErrorKind::TimeoutError,
      CheckoutError::AttemptInFlight { .. } => ErrorKind::AttemptInFlight,
      CheckoutError::UnresolvedChargePending { .. } => ErrorKind::UnresolvedChargePending,
      CheckoutError::UnknownCharge(_) => ErrorKind::UnknownCharge,
      CheckoutError::Config(_) => ErrorKind::Config,
      CheckoutError::Flow { .. } => ErrorKind::Internal,
    }
  }

  /// Whether re-invoking the flow from the start is known to be safe.
  ///
  /// Timeouts are not retryable: the remote side may have acted.
  pub fn is_retryable(&self) -> bool {
    matches!(self, CheckoutError::Network { .. })
  }

  /// The payment intent the error is bound to, when the buyer was charged.
  pub fn payment_intent_id(&self) -> Option<&str> {
    match self {
      CheckoutError::BackendConfirmFailedAfterCharge { payment_intent_id, .. }
      | CheckoutError::UnresolvedChargePending { payment_intent_id } => Some(payment_intent_id),
      _ => None,
    }
  }
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerFailure { source: err }
  }
}

pub type CheckoutResult<T, E = CheckoutError> = std::result::Result<T, E>;
