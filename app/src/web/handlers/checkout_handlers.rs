// checkout_service/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use crafthub_checkout::{CheckoutReport, CheckoutRequest, CheckoutType, DeliveryInfo, PaymentMethod};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CartCheckoutPayload {
  pub payment_method: String,
  /// Validated by the reconciler, so a missing block still yields a checkout report.
  #[serde(default)]
  pub delivery_info: Option<DeliveryInfo>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReservationCheckoutPayload {
  pub payment_method: String,
}

fn payment_method(raw: &str) -> Result<PaymentMethod, AppError> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(AppError::Validation("paymentMethod is required".to_string()));
  }
  Ok(PaymentMethod(trimmed.to_string()))
}

fn respond(report: CheckoutReport) -> Result<HttpResponse, AppError> {
  if report.is_success() {
    info!(
      order_key = %report.order_key,
      payment_intent_id = report.payment_intent_id.as_deref().unwrap_or(""),
      "Checkout confirmed."
    );
    return Ok(HttpResponse::Ok().json(json!({
      "message": "Paiement réussi",
      "report": report,
    })));
  }
  warn!(order_key = %report.order_key, state = %report.state, "Checkout attempt failed.");
  Err(AppError::AttemptFailed(Box::new(report)))
}

// --- Handler Implementations ---

#[instrument(name = "handler::checkout_cart", skip(app_state, req_payload))]
pub async fn checkout_cart_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<CartCheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let method = payment_method(&payload.payment_method)?;
  let order = app_state
    .sync
    .store()
    .read()
    .cart_aggregate(app_state.settings.currency.clone(), payload.delivery_info)
    .order;

  let report = app_state
    .reconciler
    .submit(CheckoutRequest::new(order, CheckoutType::Cart, method))
    .await?;
  respond(report)
}

#[instrument(name = "handler::checkout_reservation", skip(app_state, req_payload))]
pub async fn checkout_reservation_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<ReservationCheckoutPayload>,
) -> Result<HttpResponse, AppError> {
  let method = payment_method(&req_payload.payment_method)?;
  let aggregate = app_state
    .sync
    .store()
    .read()
    .reservation_aggregate(app_state.settings.currency.clone(), &app_state.classifier);
  if !aggregate.excluded.is_empty() {
    info!(excluded = aggregate.excluded.len(), "Expired or invalid bookings left out of the reservation.");
  }

  let report = app_state
    .reconciler
    .submit(CheckoutRequest::new(aggregate.order, CheckoutType::Reservation, method))
    .await?;
  respond(report)
}

/// Charges the gateway took that the backend never recorded.
#[instrument(name = "handler::list_unresolved", skip(app_state))]
pub async fn list_unresolved_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let charges = app_state.reconciler.unresolved();
  Ok(HttpResponse::Ok().json(json!({ "charges": charges })))
}

#[instrument(name = "handler::retry_unresolved", skip(app_state, path), fields(payment_intent_id = %path.as_str()))]
pub async fn retry_unresolved_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let payment_intent_id = path.into_inner();
  let report = app_state.reconciler.retry_confirmation(&payment_intent_id).await?;
  respond(report)
}

/// Drops a parked charge that support settled outside the checkout, so the
/// order can be submitted again.
#[instrument(name = "handler::acknowledge_unresolved", skip(app_state, path), fields(payment_intent_id = %path.as_str()))]
pub async fn acknowledge_unresolved_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let charge = app_state.reconciler.acknowledge_charge(&path.into_inner())?;
  warn!(payment_intent_id = %charge.payment_intent_id, "Unresolved charge acknowledged.");
  Ok(HttpResponse::Ok().json(json!({ "charge": charge })))
}
