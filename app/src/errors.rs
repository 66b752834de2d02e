// checkout_service/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use crafthub_checkout::{CheckoutError, CheckoutReport, ErrorKind};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  /// The checkout engine refused the request outright.
  #[error("Checkout Error: {source}")]
  Checkout {
    #[from]
    source: CheckoutError,
  },

  /// A checkout attempt ran and ended in a failure state.
  #[error("Checkout attempt failed")]
  AttemptFailed(Box<CheckoutReport>),
}

/// HTTP status for each checkout failure kind.
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
  match kind {
    ErrorKind::EmptyOrder | ErrorKind::MissingDeliveryInfo | ErrorKind::InvalidAmount | ErrorKind::InvalidCurrency => {
      StatusCode::BAD_REQUEST
    }
    ErrorKind::GatewayRejected => StatusCode::PAYMENT_REQUIRED,
    ErrorKind::BackendValidationError => StatusCode::UNPROCESSABLE_ENTITY,
    ErrorKind::AttemptInFlight | ErrorKind::UnresolvedChargePending => StatusCode::CONFLICT,
    ErrorKind::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
    ErrorKind::NetworkError | ErrorKind::BackendConfirmFailedAfterCharge => StatusCode::BAD_GATEWAY,
    ErrorKind::UnknownCharge => StatusCode::NOT_FOUND,
    ErrorKind::Config | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
      AppError::Checkout { source } => status_for_kind(source.kind()),
      AppError::AttemptFailed(report) => report
        .failure
        .as_ref()
        .map(|f| status_for_kind(f.kind))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, "Responding with error");
    }
    let mut builder = HttpResponse::build(status);
    match self {
      AppError::Validation(m) | AppError::NotFound(m) => builder.json(json!({"error": m})),
      AppError::Config(m) => builder.json(json!({"error": "Configuration issue", "detail": m})),
      AppError::Checkout { source } => builder.json(json!({
        "error": source.to_string(),
        "kind": source.kind(),
        "retryable": source.is_retryable(),
        "paymentIntentId": source.payment_intent_id(),
      })),
      AppError::AttemptFailed(report) => {
        let failure = report.failure.as_ref();
        builder.json(json!({
          "error": failure.map(|f| f.message.as_str()).unwrap_or("Checkout failed"),
          "kind": failure.map(|f| f.kind),
          "retryable": failure.map(|f| f.retryable).unwrap_or(false),
          "paymentIntentId": report.payment_intent_id,
          "report": report,
        }))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
