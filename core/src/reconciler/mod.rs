// crafthub-checkout/src/reconciler/mod.rs

//! Payment confirmation reconciler.
//!
//! Drives one checkout attempt through intent creation, gateway authorization,
//! backend confirmation and the local commit, as a [`Flow`](crate::flow::Flow)
//! over a [`CheckoutAttempt`]. Attempt failures never surface as `Err`: they
//! are reported in the returned [`CheckoutReport`].

pub mod attempt;
mod committed;
pub mod ledger;
mod stages;

use std::fmt;
use std::sync::Arc;
use tracing::{event, instrument, Level};

use crate::backend::CheckoutBackend;
use crate::error::{CheckoutError, CheckoutResult};
use crate::flow::SharedState;
use crate::gateway::PaymentGateway;
use crate::guard::InFlightRegistry;
use crate::intent::PaymentIntentClient;
use crate::model::{CheckoutType, PaymentMethod, PendingOrder};
use crate::settings::CheckoutSettings;
use crate::store::StoreHandle;

pub use attempt::{
  CheckoutAttempt, CheckoutFailure, CheckoutReceipt, CheckoutReport, CheckoutStage, CheckoutState, SuccessCallback,
  Transition,
};
pub use ledger::{UnresolvedCharge, UnresolvedCharges};

use committed::CommittedIntents;
use stages::{checkout_flow, CheckoutFlow, Services};

/// Everything needed to start one attempt.
pub struct CheckoutRequest {
  order: PendingOrder,
  checkout_type: CheckoutType,
  payment_method: PaymentMethod,
  on_success: Option<SuccessCallback>,
}

impl CheckoutRequest {
  pub fn new(order: PendingOrder, checkout_type: CheckoutType, payment_method: PaymentMethod) -> Self {
    Self {
      order,
      checkout_type,
      payment_method,
      on_success: None,
    }
  }

  /// Runs once, after the order is recorded and the local commit applied.
  /// Never runs for a failed attempt or a duplicate confirmation.
  pub fn on_success(mut self, callback: impl FnOnce(&CheckoutReceipt) + Send + Sync + 'static) -> Self {
    self.on_success = Some(Box::new(callback));
    self
  }

  pub fn order(&self) -> &PendingOrder {
    &self.order
  }
}

pub struct Reconciler {
  services: Arc<Services>,
  flow: CheckoutFlow,
  in_flight: Arc<InFlightRegistry>,
}

impl Reconciler {
  pub fn new(
    backend: Arc<dyn CheckoutBackend>,
    gateway: Arc<dyn PaymentGateway>,
    store: StoreHandle,
    settings: CheckoutSettings,
  ) -> Self {
    Self::with_in_flight(backend, gateway, store, settings, InFlightRegistry::new())
  }

  /// Like [`Reconciler::new`], sharing an existing in-flight registry (the
  /// store refresher watches the same one).
  pub fn with_in_flight(
    backend: Arc<dyn CheckoutBackend>,
    gateway: Arc<dyn PaymentGateway>,
    store: StoreHandle,
    settings: CheckoutSettings,
    in_flight: Arc<InFlightRegistry>,
  ) -> Self {
    let services = Arc::new(Services {
      intents: PaymentIntentClient::new(backend.clone(), settings.backend_timeout),
      gateway,
      backend,
      store,
      ledger: Arc::new(UnresolvedCharges::default()),
      committed: CommittedIntents::default(),
      settings,
    });
    let flow = checkout_flow(services.clone());
    Self {
      services,
      flow,
      in_flight,
    }
  }

  pub fn in_flight(&self) -> Arc<InFlightRegistry> {
    self.in_flight.clone()
  }

  pub fn store(&self) -> &StoreHandle {
    &self.services.store
  }

  pub fn settings(&self) -> &CheckoutSettings {
    &self.services.settings
  }

  /// Charges taken by the gateway that the backend has not recorded.
  pub fn unresolved(&self) -> Vec<UnresolvedCharge> {
    self.services.ledger.list()
  }

  /// Drops a parked charge without recording the order, once support has
  /// settled it outside the checkout (refund or manual entry). A new submit
  /// for the same order is accepted afterwards.
  #[instrument(name = "Reconciler::acknowledge_charge", skip(self))]
  pub fn acknowledge_charge(&self, payment_intent_id: &str) -> CheckoutResult<UnresolvedCharge> {
    let charge = self
      .services
      .ledger
      .resolve(payment_intent_id)
      .ok_or_else(|| CheckoutError::UnknownCharge(payment_intent_id.to_string()))?;
    event!(Level::WARN, %payment_intent_id, amount_minor_units = charge.amount_minor_units, "Unresolved charge acknowledged without a recorded order.");
    Ok(charge)
  }

  /// Runs one checkout attempt to a terminal state.
  ///
  /// `Err` only when the attempt could not start (another attempt for the same
  /// order is running, or the order already has a charge waiting in the
  /// ledger) or the flow itself is broken.
  #[instrument(name = "Reconciler::submit", skip_all, fields(order_key = %request.order.order_key, checkout_type = %request.checkout_type))]
  pub async fn submit(&self, request: CheckoutRequest) -> CheckoutResult<CheckoutReport> {
    let _guard = self.in_flight.try_acquire(request.order.order_key)?;
    // Charging again would bill the buyer twice for one order.
    if let Some(charge) = self.services.ledger.for_order(request.order.order_key) {
      event!(Level::WARN, payment_intent_id = %charge.payment_intent_id, "Order already charged and waiting for confirmation.");
      return Err(CheckoutError::UnresolvedChargePending {
        payment_intent_id: charge.payment_intent_id,
      });
    }

    let mut attempt = CheckoutAttempt::new(request.order, request.checkout_type, Some(request.payment_method));
    attempt.on_success = request.on_success;
    self.run(attempt).await
  }

  /// Re-sends the backend confirmation of a charged-but-unrecorded payment,
  /// with the same payment intent id. On success the order is committed and
  /// the charge leaves the ledger.
  #[instrument(name = "Reconciler::retry_confirmation", skip(self))]
  pub async fn retry_confirmation(&self, payment_intent_id: &str) -> CheckoutResult<CheckoutReport> {
    let charge = self
      .services
      .ledger
      .get(payment_intent_id)
      .ok_or_else(|| CheckoutError::UnknownCharge(payment_intent_id.to_string()))?;
    let _guard = self.in_flight.try_acquire(charge.order.order_key)?;

    let mut attempt = CheckoutAttempt::new(charge.order, charge.checkout_type, None);
    attempt.state = CheckoutState::BackendConfirmFailed;
    attempt.payment_intent_id = Some(charge.payment_intent_id);
    attempt.resumed = true;
    attempt.transition(CheckoutState::GatewaySucceeded);
    self.run(attempt).await
  }

  async fn run(&self, attempt: CheckoutAttempt) -> CheckoutResult<CheckoutReport> {
    let state = SharedState::new(attempt);
    let outcome = self.flow.run(state.clone()).await?;

    let report = CheckoutReport::from(&*state.read());
    event!(
      Level::INFO,
      ?outcome,
      state = %report.state,
      payment_intent_id = report.payment_intent_id.as_deref().unwrap_or(""),
      "Checkout attempt finished."
    );
    Ok(report)
  }
}

impl fmt::Debug for Reconciler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Reconciler")
      .field("settings", &self.services.settings)
      .field("unresolved", &self.services.ledger.len())
      .field("committed", &self.services.committed.len())
      .finish_non_exhaustive()
  }
}
