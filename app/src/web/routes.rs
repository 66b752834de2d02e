// checkout_service/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{booking_handlers, cart_handlers, checkout_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler))
          .route("/{product_id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      )
      .service(
        web::scope("/bookings")
          .route("", web::get().to(booking_handlers::list_bookings_handler))
          .route("/{booking_id}", web::delete().to(booking_handlers::cancel_booking_handler)),
      )
      .service(
        web::scope("/checkout")
          .route("/cart", web::post().to(checkout_handlers::checkout_cart_handler))
          .route("/reservation", web::post().to(checkout_handlers::checkout_reservation_handler))
          .route("/unresolved", web::get().to(checkout_handlers::list_unresolved_handler))
          .route(
            "/unresolved/{payment_intent_id}",
            web::delete().to(checkout_handlers::acknowledge_unresolved_handler),
          )
          .route(
            "/unresolved/{payment_intent_id}/retry",
            web::post().to(checkout_handlers::retry_unresolved_handler),
          ),
      ),
  );
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::state::AppState;
  use actix_web::http::StatusCode;
  use actix_web::{test, App};
  use async_trait::async_trait;
  use chrono::{Duration, TimeZone, Utc};
  use crafthub_checkout::backend::{
    CheckoutBackend, ConfirmBookingsRequest, ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentIntentRequest,
    CreatePaymentIntentResponse,
  };
  use crafthub_checkout::gateway::{GatewayConfirmation, IntentStatus, PaymentGateway};
  use crafthub_checkout::{
    CartEntry, CheckoutError, CheckoutResult, CheckoutSettings, CheckoutType, ExpiryClassifier, PaymentMethod,
    WorkshopBooking,
  };
  use rust_decimal_macros::dec;
  use serde_json::{json, Value};
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};

  struct StubBackend {
    cart: Mutex<Vec<CartEntry>>,
    bookings: Mutex<Vec<WorkshopBooking>>,
    fail_confirm: AtomicBool,
    confirm_calls: AtomicUsize,
  }

  impl StubBackend {
    fn new(cart: Vec<CartEntry>, bookings: Vec<WorkshopBooking>) -> Self {
      Self {
        cart: Mutex::new(cart),
        bookings: Mutex::new(bookings),
        fail_confirm: AtomicBool::new(false),
        confirm_calls: AtomicUsize::new(0),
      }
    }
  }

  #[async_trait]
  impl CheckoutBackend for StubBackend {
    async fn create_payment_intent(
      &self,
      _request: &CreatePaymentIntentRequest,
    ) -> CheckoutResult<CreatePaymentIntentResponse> {
      Ok(CreatePaymentIntentResponse {
        client_secret: "pi_route_secret_1".to_string(),
        amount_cents: None,
        currency: None,
      })
    }

    async fn confirm_payment(
      &self,
      _checkout_type: CheckoutType,
      _request: &ConfirmPaymentRequest,
    ) -> CheckoutResult<ConfirmPaymentResponse> {
      self.confirm_calls.fetch_add(1, Ordering::SeqCst);
      if self.fail_confirm.load(Ordering::SeqCst) {
        return Err(CheckoutError::Network {
          operation: "backend confirmation",
          message: "503 Service Unavailable".to_string(),
        });
      }
      Ok(ConfirmPaymentResponse {
        message: Some("ok".to_string()),
      })
    }

    async fn get_cart(&self) -> CheckoutResult<Vec<CartEntry>> {
      Ok(self.cart.lock().unwrap().clone())
    }

    async fn remove_cart_item(&self, product_id: &str) -> CheckoutResult<()> {
      self.cart.lock().unwrap().retain(|e| e.product_id != product_id);
      Ok(())
    }

    async fn clear_cart(&self) -> CheckoutResult<()> {
      self.cart.lock().unwrap().clear();
      Ok(())
    }

    async fn get_bookings(&self) -> CheckoutResult<Vec<WorkshopBooking>> {
      Ok(self.bookings.lock().unwrap().clone())
    }

    async fn remove_booking(&self, booking_id: &str) -> CheckoutResult<()> {
      self.bookings.lock().unwrap().retain(|b| b.booking_id != booking_id);
      Ok(())
    }

    async fn confirm_bookings(&self, _request: &ConfirmBookingsRequest) -> CheckoutResult<()> {
      Ok(())
    }
  }

  struct StubGateway {
    decline: bool,
  }

  #[async_trait]
  impl PaymentGateway for StubGateway {
    async fn confirm_card_payment(
      &self,
      client_secret: &str,
      _payment_method: &PaymentMethod,
    ) -> CheckoutResult<GatewayConfirmation> {
      if self.decline {
        return Err(CheckoutError::GatewayRejected("Your card was declined.".to_string()));
      }
      Ok(GatewayConfirmation {
        payment_intent_id: client_secret.split("_secret_").next().unwrap_or(client_secret).to_string(),
        status: IntentStatus::Succeeded,
      })
    }
  }

  fn entry(id: &str, price: rust_decimal::Decimal, quantity: i64) -> CartEntry {
    CartEntry {
      product_id: id.to_string(),
      name: id.to_string(),
      price,
      quantity,
      artisan_id: "artisan".to_string(),
    }
  }

  fn booking(id: &str, days_from_now: i64) -> WorkshopBooking {
    WorkshopBooking {
      booking_id: id.to_string(),
      workshop_id: format!("ws-{}", id),
      title: "Pottery".to_string(),
      scheduled_at: Some(Utc.with_ymd_and_hms(2025, 5, 20, 14, 0, 0).unwrap() + Duration::days(days_from_now)),
      unit_price: dec!(42.50),
      quantity: 1,
      places_remaining: Some(3),
      artisan_id: "artisan".to_string(),
    }
  }

  async fn state_with(backend: Arc<StubBackend>, decline: bool) -> AppState {
    let classifier = ExpiryClassifier::fixed(Utc.with_ymd_and_hms(2025, 5, 20, 14, 0, 0).unwrap());
    let state = AppState::build(backend, Arc::new(StubGateway { decline }), CheckoutSettings::default(), classifier);
    state.sync.refresh().await.unwrap();
    state
  }

  fn sample_backend() -> Arc<StubBackend> {
    Arc::new(StubBackend::new(
      vec![entry("vase", dec!(29.99), 2), entry("bowl", dec!(10.00), 1)],
      vec![booking("past", -1), booking("next", 3)],
    ))
  }

  fn delivery() -> Value {
    json!({"phone": "+216 20 123 456", "address": "14 rue des Artisans"})
  }

  #[actix_web::test]
  async fn cart_view_reports_the_pending_total() {
    let state = state_with(sample_backend(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::get().uri("/api/v1/cart").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["totalMinorUnits"], 6998);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["items"][0]["productId"], "vase");
    assert_eq!(body["items"][0]["artisanId"], "artisan");
    assert!(body["items"][0].get("product_id").is_none());
  }

  #[actix_web::test]
  async fn bookings_view_marks_expired_rows_and_totals_active_ones() {
    let state = state_with(sample_backend(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::get().uri("/api/v1/bookings").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["totalMinorUnits"], 4250);
    assert_eq!(body["activeCount"], 1);
    let statuses: Vec<&str> = body["bookings"]
      .as_array()
      .unwrap()
      .iter()
      .map(|b| b["status"].as_str().unwrap())
      .collect();
    assert_eq!(statuses, vec!["EXPIRED", "UPCOMING"]);
    let row = &body["bookings"][1];
    assert_eq!(row["bookingId"], "next");
    assert_eq!(row["workshopId"], "ws-next");
    assert!(row["scheduledAt"].is_string());
    assert!(row.get("booking_id").is_none());
  }

  #[actix_web::test]
  async fn cart_checkout_succeeds_and_empties_the_cart() {
    let backend = sample_backend();
    let state = state_with(backend.clone(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::post()
      .uri("/api/v1/checkout/cart")
      .set_json(json!({"paymentMethod": "pm_card_visa", "deliveryInfo": delivery()}))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["report"]["paymentIntentId"], "pi_route");
    assert_eq!(body["report"]["receipt"]["amountMinorUnits"], 6998);

    let req = test::TestRequest::get().uri("/api/v1/cart").to_request();
    let cart: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cart["totalMinorUnits"], 0);
  }

  #[actix_web::test]
  async fn cart_checkout_without_delivery_info_is_a_bad_request() {
    let backend = sample_backend();
    let state = state_with(backend.clone(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::post()
      .uri("/api/v1/checkout/cart")
      .set_json(json!({"paymentMethod": "pm_card_visa"}))
      .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "MISSING_DELIVERY_INFO");
    assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 0);
  }

  #[actix_web::test]
  async fn declined_card_maps_to_payment_required() {
    let state = state_with(sample_backend(), true).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::post()
      .uri("/api/v1/checkout/cart")
      .set_json(json!({"paymentMethod": "pm_card_visa", "deliveryInfo": delivery()}))
      .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::PAYMENT_REQUIRED);
  }

  #[actix_web::test]
  async fn unrecorded_charge_is_listed_and_can_be_retried() {
    let backend = sample_backend();
    backend.fail_confirm.store(true, Ordering::SeqCst);
    let state = state_with(backend.clone(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::post()
      .uri("/api/v1/checkout/reservation")
      .set_json(json!({"paymentMethod": "pm_card_visa"}))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "BACKEND_CONFIRM_FAILED_AFTER_CHARGE");
    assert_eq!(body["paymentIntentId"], "pi_route");

    let req = test::TestRequest::get().uri("/api/v1/checkout/unresolved").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["charges"].as_array().unwrap().len(), 1);

    backend.fail_confirm.store(false, Ordering::SeqCst);
    let req = test::TestRequest::post()
      .uri("/api/v1/checkout/unresolved/pi_route/retry")
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/v1/checkout/unresolved").to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert!(listed["charges"].as_array().unwrap().is_empty());
  }

  #[actix_web::test]
  async fn parked_charge_blocks_resubmit_until_acknowledged() {
    let backend = sample_backend();
    backend.fail_confirm.store(true, Ordering::SeqCst);
    let state = state_with(backend.clone(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;
    let reserve = || {
      test::TestRequest::post()
        .uri("/api/v1/checkout/reservation")
        .set_json(json!({"paymentMethod": "pm_card_visa"}))
        .to_request()
    };

    assert_eq!(test::call_service(&app, reserve()).await.status(), StatusCode::BAD_GATEWAY);

    let resp = test::call_service(&app, reserve()).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "UNRESOLVED_CHARGE_PENDING");
    assert_eq!(body["paymentIntentId"], "pi_route");
    assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 1);

    let req = test::TestRequest::delete().uri("/api/v1/checkout/unresolved/pi_route").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["charge"]["amountMinorUnits"], 4250);

    backend.fail_confirm.store(false, Ordering::SeqCst);
    assert_eq!(test::call_service(&app, reserve()).await.status(), StatusCode::OK);
  }

  #[actix_web::test]
  async fn retrying_an_unknown_charge_is_not_found() {
    let state = state_with(sample_backend(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::post()
      .uri("/api/v1/checkout/unresolved/pi_missing/retry")
      .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[actix_web::test]
  async fn removing_an_absent_cart_item_is_not_found() {
    let state = state_with(sample_backend(), false).await;
    let app = test::init_service(App::new().app_data(web::Data::new(state)).configure(configure_app_routes)).await;

    let req = test::TestRequest::delete().uri("/api/v1/cart/vase").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

    let req = test::TestRequest::delete().uri("/api/v1/cart/vase").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
  }
}
