// tests/common/mod.rs
#![allow(dead_code)] // Not every test file uses every helper

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use crafthub_checkout::backend::{
  CheckoutBackend, ConfirmBookingsRequest, ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentIntentRequest,
  CreatePaymentIntentResponse,
};
use crafthub_checkout::gateway::{GatewayConfirmation, IntentStatus, PaymentGateway};
use crafthub_checkout::{
  CartEntry, CheckoutError, CheckoutResult, CheckoutSettings, CheckoutStore, CheckoutType, DeliveryInfo, PaymentMethod,
  Reconciler, StoreHandle, WorkshopBooking,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::Level;

// --- Tracing, installed once per test binary ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Fixtures ---
pub fn fixed_now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 5, 20, 14, 0, 0).unwrap()
}

pub fn cart_entry(id: &str, price: Decimal, quantity: i64) -> CartEntry {
  CartEntry {
    product_id: id.to_string(),
    name: format!("Handmade {}", id),
    price,
    quantity,
    artisan_id: "artisan-7".to_string(),
  }
}

/// `29.99 x 2 + 10.00 x 1 = 69.98`
pub fn sample_cart() -> Vec<CartEntry> {
  vec![cart_entry("vase", dec!(29.99), 2), cart_entry("bowl", dec!(10.00), 1)]
}

pub fn booking(id: &str, price: Decimal, quantity: i64, days_from_now: i64) -> WorkshopBooking {
  WorkshopBooking {
    booking_id: id.to_string(),
    workshop_id: format!("ws-{}", id),
    title: format!("Workshop {}", id),
    scheduled_at: Some(fixed_now() + Duration::days(days_from_now)),
    unit_price: price,
    quantity,
    places_remaining: Some(6),
    artisan_id: "artisan-3".to_string(),
  }
}

pub fn delivery() -> DeliveryInfo {
  DeliveryInfo {
    phone: "+216 20 123 456".to_string(),
    address: "14 rue des Artisans, Tunis".to_string(),
  }
}

pub fn card() -> PaymentMethod {
  PaymentMethod("pm_card_visa".to_string())
}

// --- In-memory backend ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmBehavior {
  Succeed,
  /// Fail with a 5xx-style network error this many times, then succeed.
  FailTimes(usize),
  AlwaysFail,
  /// Never answers; only a deadline ends the call.
  Hang,
}

/// Long enough to outlast every configured deadline.
const HANG: std::time::Duration = std::time::Duration::from_secs(3600);

pub struct MockBackend {
  pub client_secret: Mutex<String>,
  pub echo_amount: Mutex<Option<i64>>,
  pub confirm_behavior: Mutex<ConfirmBehavior>,
  pub fail_cleanup: Mutex<bool>,
  /// When set, intent creation fails with a server error.
  pub fail_intent: Mutex<bool>,
  pub cart: Mutex<Vec<CartEntry>>,
  pub bookings: Mutex<Vec<WorkshopBooking>>,
  pub intent_requests: Mutex<Vec<CreatePaymentIntentRequest>>,
  pub confirm_requests: Mutex<Vec<(CheckoutType, ConfirmPaymentRequest)>>,
  pub booking_confirmations: Mutex<Vec<ConfirmBookingsRequest>>,
  pub removed_cart_items: Mutex<Vec<String>>,
  pub intent_calls: AtomicUsize,
  pub confirm_calls: AtomicUsize,
  pub clear_calls: AtomicUsize,
  pub fetch_calls: AtomicUsize,
}

impl Default for MockBackend {
  fn default() -> Self {
    Self {
      client_secret: Mutex::new("pi_test_1_secret_abc".to_string()),
      echo_amount: Mutex::new(None),
      confirm_behavior: Mutex::new(ConfirmBehavior::Succeed),
      fail_cleanup: Mutex::new(false),
      fail_intent: Mutex::new(false),
      cart: Mutex::new(Vec::new()),
      bookings: Mutex::new(Vec::new()),
      intent_requests: Mutex::new(Vec::new()),
      confirm_requests: Mutex::new(Vec::new()),
      booking_confirmations: Mutex::new(Vec::new()),
      removed_cart_items: Mutex::new(Vec::new()),
      intent_calls: AtomicUsize::new(0),
      confirm_calls: AtomicUsize::new(0),
      clear_calls: AtomicUsize::new(0),
      fetch_calls: AtomicUsize::new(0),
    }
  }
}

impl MockBackend {
  pub fn with_confirm(behavior: ConfirmBehavior) -> Self {
    let backend = Self::default();
    *backend.confirm_behavior.lock() = behavior;
    backend
  }

  pub fn intent_calls(&self) -> usize {
    self.intent_calls.load(Ordering::SeqCst)
  }

  pub fn confirm_calls(&self) -> usize {
    self.confirm_calls.load(Ordering::SeqCst)
  }

  pub fn clear_calls(&self) -> usize {
    self.clear_calls.load(Ordering::SeqCst)
  }

  pub fn network_calls(&self) -> usize {
    self.intent_calls() + self.confirm_calls() + self.clear_calls() + self.booking_confirmations.lock().len()
  }

  fn server_error(operation: &'static str) -> CheckoutError {
    CheckoutError::Network {
      operation,
      message: "500 Internal Server Error".to_string(),
    }
  }
}

#[async_trait]
impl CheckoutBackend for MockBackend {
  async fn create_payment_intent(&self, request: &CreatePaymentIntentRequest) -> CheckoutResult<CreatePaymentIntentResponse> {
    self.intent_calls.fetch_add(1, Ordering::SeqCst);
    self.intent_requests.lock().push(request.clone());
    if *self.fail_intent.lock() {
      return Err(Self::server_error("payment intent creation"));
    }
    Ok(CreatePaymentIntentResponse {
      client_secret: self.client_secret.lock().clone(),
      amount_cents: *self.echo_amount.lock(),
      currency: None,
    })
  }

  async fn confirm_payment(
    &self,
    checkout_type: CheckoutType,
    request: &ConfirmPaymentRequest,
  ) -> CheckoutResult<ConfirmPaymentResponse> {
    let call = self.confirm_calls.fetch_add(1, Ordering::SeqCst);
    self.confirm_requests.lock().push((checkout_type, request.clone()));
    let behavior = *self.confirm_behavior.lock();
    match behavior {
      ConfirmBehavior::Succeed => {}
      ConfirmBehavior::FailTimes(n) if call < n => return Err(Self::server_error("backend confirmation")),
      ConfirmBehavior::FailTimes(_) => {}
      ConfirmBehavior::AlwaysFail => return Err(Self::server_error("backend confirmation")),
      ConfirmBehavior::Hang => tokio::time::sleep(HANG).await,
    }
    Ok(ConfirmPaymentResponse {
      message: Some("Paiement confirmé".to_string()),
    })
  }

  async fn get_cart(&self) -> CheckoutResult<Vec<CartEntry>> {
    self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.cart.lock().clone())
  }

  async fn remove_cart_item(&self, product_id: &str) -> CheckoutResult<()> {
    self.removed_cart_items.lock().push(product_id.to_string());
    self.cart.lock().retain(|entry| entry.product_id != product_id);
    Ok(())
  }

  async fn clear_cart(&self) -> CheckoutResult<()> {
    self.clear_calls.fetch_add(1, Ordering::SeqCst);
    if *self.fail_cleanup.lock() {
      return Err(Self::server_error("cart clear"));
    }
    self.cart.lock().clear();
    Ok(())
  }

  async fn get_bookings(&self) -> CheckoutResult<Vec<WorkshopBooking>> {
    self.fetch_calls.fetch_add(1, Ordering::SeqCst);
    Ok(self.bookings.lock().clone())
  }

  async fn remove_booking(&self, booking_id: &str) -> CheckoutResult<()> {
    self.bookings.lock().retain(|booking| booking.booking_id != booking_id);
    Ok(())
  }

  async fn confirm_bookings(&self, request: &ConfirmBookingsRequest) -> CheckoutResult<()> {
    self.booking_confirmations.lock().push(request.clone());
    if *self.fail_cleanup.lock() {
      return Err(Self::server_error("bookings confirmation"));
    }
    Ok(())
  }
}

// --- In-memory gateway ---
#[derive(Debug, Clone)]
pub enum GatewayBehavior {
  /// Succeeds with the intent id taken from the client secret.
  Succeed,
  /// Succeeds, always reporting this intent id.
  SucceedAs(String),
  Decline(String),
  Status(IntentStatus),
  Hang,
}

pub struct MockGateway {
  pub behavior: Mutex<GatewayBehavior>,
  /// When set, every confirmation waits for a notification first.
  pub gate: Option<Arc<Notify>>,
  pub calls: AtomicUsize,
}

impl MockGateway {
  pub fn new(behavior: GatewayBehavior) -> Self {
    Self {
      behavior: Mutex::new(behavior),
      gate: None,
      calls: AtomicUsize::new(0),
    }
  }

  pub fn gated(behavior: GatewayBehavior, gate: Arc<Notify>) -> Self {
    Self {
      gate: Some(gate),
      ..Self::new(behavior)
    }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  async fn confirm_card_payment(&self, client_secret: &str, _payment_method: &PaymentMethod) -> CheckoutResult<GatewayConfirmation> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      gate.notified().await;
    }
    let behavior = self.behavior.lock().clone();
    let from_secret = || client_secret.split("_secret_").next().unwrap_or(client_secret).to_string();
    match behavior {
      GatewayBehavior::Succeed => Ok(GatewayConfirmation {
        payment_intent_id: from_secret(),
        status: IntentStatus::Succeeded,
      }),
      GatewayBehavior::SucceedAs(id) => Ok(GatewayConfirmation {
        payment_intent_id: id,
        status: IntentStatus::Succeeded,
      }),
      GatewayBehavior::Decline(message) => Err(CheckoutError::GatewayRejected(message)),
      GatewayBehavior::Status(status) => Ok(GatewayConfirmation {
        payment_intent_id: from_secret(),
        status,
      }),
      GatewayBehavior::Hang => {
        tokio::time::sleep(HANG).await;
        Err(CheckoutError::GatewayRejected("gateway never answered".to_string()))
      }
    }
  }
}

// --- Wiring ---
pub struct Harness {
  pub backend: Arc<MockBackend>,
  pub gateway: Arc<MockGateway>,
  pub store: StoreHandle,
  pub reconciler: Arc<Reconciler>,
}

pub fn harness(backend: MockBackend, gateway: MockGateway, store: CheckoutStore) -> Harness {
  let backend = Arc::new(backend);
  let gateway = Arc::new(gateway);
  let store = store.shared();
  let reconciler = Arc::new(Reconciler::new(
    backend.clone(),
    gateway.clone(),
    store.clone(),
    CheckoutSettings::default(),
  ));
  Harness {
    backend,
    gateway,
    store,
    reconciler,
  }
}

/// Counts invocations of a success callback.
pub fn callback_counter() -> Arc<AtomicUsize> {
  Arc::new(AtomicUsize::new(0))
}
