// crafthub-checkout/src/backend/http.rs

//! `reqwest` implementation of [`CheckoutBackend`].

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{event, instrument, Level};

use super::dto::{BookingDto, CartDto, ErrorBody};
use super::{
  CheckoutBackend, ConfirmBookingsRequest, ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentIntentRequest,
  CreatePaymentIntentResponse,
};
use crate::error::{CheckoutError, CheckoutResult};
use crate::model::{CartEntry, CheckoutType, WorkshopBooking};

#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
  /// e.g. `https://api.crafthub.app/api`
  pub base_url: String,
  /// Bearer token of the buyer the service acts for.
  pub token: String,
  pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
  client: reqwest::Client,
  base_url: String,
  token: String,
}

impl HttpBackend {
  pub fn new(config: HttpBackendConfig) -> CheckoutResult<Self> {
    let client = reqwest::Client::builder()
      .timeout(config.timeout)
      .build()
      .map_err(|e| CheckoutError::Config(format!("Failed to build backend HTTP client: {}", e)))?;
    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      token: config.token,
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  fn get(&self, path: &str) -> RequestBuilder {
    self.client.get(self.url(path)).bearer_auth(&self.token)
  }

  fn post(&self, path: &str) -> RequestBuilder {
    self.client.post(self.url(path)).bearer_auth(&self.token)
  }

  fn delete(&self, path: &str) -> RequestBuilder {
    self.client.delete(self.url(path)).bearer_auth(&self.token)
  }

  async fn execute(&self, operation: &'static str, request: RequestBuilder) -> CheckoutResult<Response> {
    let response = request.send().await.map_err(|e| transport_error(operation, e))?;
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    let message = body.message().unwrap_or_else(|| status.to_string());
    event!(Level::WARN, operation, status = status.as_u16(), %message, "Backend returned an error status.");
    Err(status_error(operation, status, message))
  }

  async fn execute_json<T: DeserializeOwned>(&self, operation: &'static str, request: RequestBuilder) -> CheckoutResult<T> {
    let response = self.execute(operation, request).await?;
    response.json::<T>().await.map_err(|e| transport_error(operation, e))
  }
}

/// Classifies a `reqwest` failure that happened before a status was seen, or
/// while reading the body.
fn transport_error(operation: &'static str, err: reqwest::Error) -> CheckoutError {
  if err.is_timeout() {
    CheckoutError::Timeout { operation }
  } else {
    CheckoutError::Network {
      operation,
      message: err.to_string(),
    }
  }
}

/// 4xx means the backend refused the request on its merits; anything else is
/// treated as transient.
fn status_error(operation: &'static str, status: StatusCode, message: String) -> CheckoutError {
  if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
    CheckoutError::Timeout { operation }
  } else if status.is_client_error() {
    CheckoutError::BackendValidation(message)
  } else {
    CheckoutError::Network { operation, message }
  }
}

#[async_trait]
impl CheckoutBackend for HttpBackend {
  #[instrument(name = "HttpBackend::create_payment_intent", skip_all, fields(amount_cents = request.amount_cents, checkout_type = %request.checkout_type))]
  async fn create_payment_intent(&self, request: &CreatePaymentIntentRequest) -> CheckoutResult<CreatePaymentIntentResponse> {
    self
      .execute_json("payment intent request", self.post("/payments/create-payment-intent").json(request))
      .await
  }

  #[instrument(name = "HttpBackend::confirm_payment", skip_all, fields(payment_intent_id = %request.payment_intent_id, checkout_type = %checkout_type))]
  async fn confirm_payment(
    &self,
    checkout_type: CheckoutType,
    request: &ConfirmPaymentRequest,
  ) -> CheckoutResult<ConfirmPaymentResponse> {
    let path = match checkout_type {
      CheckoutType::Cart => "/payments/confirm-payment",
      CheckoutType::Reservation => "/payments/confirm-payment-res",
    };
    self.execute_json("backend confirmation", self.post(path).json(request)).await
  }

  #[instrument(name = "HttpBackend::get_cart", skip_all)]
  async fn get_cart(&self) -> CheckoutResult<Vec<CartEntry>> {
    let cart: CartDto = self.execute_json("cart fetch", self.get("/cart")).await?;
    Ok(cart.into_entries())
  }

  #[instrument(name = "HttpBackend::remove_cart_item", skip(self))]
  async fn remove_cart_item(&self, product_id: &str) -> CheckoutResult<()> {
    let path = format!("/cart/remove/{}", product_id);
    self.execute("cart item removal", self.delete(&path)).await?;
    Ok(())
  }

  #[instrument(name = "HttpBackend::clear_cart", skip_all)]
  async fn clear_cart(&self) -> CheckoutResult<()> {
    self.execute("cart clear", self.post("/cart/clear")).await?;
    Ok(())
  }

  #[instrument(name = "HttpBackend::get_bookings", skip_all)]
  async fn get_bookings(&self) -> CheckoutResult<Vec<WorkshopBooking>> {
    let bookings: Vec<BookingDto> = self.execute_json("bookings fetch", self.get("/bookings")).await?;
    Ok(bookings.into_iter().map(WorkshopBooking::from).collect())
  }

  #[instrument(name = "HttpBackend::remove_booking", skip(self))]
  async fn remove_booking(&self, booking_id: &str) -> CheckoutResult<()> {
    let path = format!("/bookings/remove/{}", booking_id);
    self.execute("booking cancellation", self.delete(&path)).await?;
    Ok(())
  }

  #[instrument(name = "HttpBackend::confirm_bookings", skip_all, fields(num_bookings = request.booking_ids.len()))]
  async fn confirm_bookings(&self, request: &ConfirmBookingsRequest) -> CheckoutResult<()> {
    self.execute("bookings confirmation", self.post("/bookings/confirm").json(request)).await?;
    Ok(())
  }
}
