// crafthub-checkout/src/reconciler/stages.rs

//! Handlers of the checkout flow and its assembly.
//!
//! Every handler copies what it needs out of the attempt, drops the lock,
//! awaits, then writes its result back. Expected failures are recorded on the
//! attempt and halt the flow; `Err` is reserved for broken invariants.

use anyhow::anyhow;
use std::sync::Arc;
use tracing::{event, Level};

use super::attempt::{CheckoutAttempt, CheckoutReceipt, CheckoutStage, CheckoutState};
use super::committed::CommittedIntents;
use super::ledger::UnresolvedCharges;
use crate::backend::{CheckoutBackend, ConfirmBookingsRequest, ConfirmPaymentRequest};
use crate::bounded::bounded;
use crate::error::{CheckoutError, FlowError};
use crate::flow::{Flow, FlowControl, SharedState};
use crate::gateway::{GatewayConfirmation, PaymentGateway};
use crate::intent::PaymentIntentClient;
use crate::model::{CheckoutType, PendingOrder};
use crate::settings::CheckoutSettings;
use crate::store::{CommitAction, StoreHandle};

pub(crate) type CheckoutFlow = Flow<CheckoutStage, CheckoutAttempt, CheckoutError>;
type StageResult = Result<FlowControl, CheckoutError>;

/// Collaborators shared by every attempt.
pub(crate) struct Services {
  pub intents: PaymentIntentClient,
  pub gateway: Arc<dyn PaymentGateway>,
  pub backend: Arc<dyn CheckoutBackend>,
  pub store: StoreHandle,
  pub ledger: Arc<UnresolvedCharges>,
  /// Payment intents whose order has been committed locally.
  pub committed: CommittedIntents,
  pub settings: CheckoutSettings,
}

pub(crate) fn checkout_flow(services: Arc<Services>) -> CheckoutFlow {
  let mut flow = CheckoutFlow::new("checkout", &CheckoutStage::ALL);

  // A confirmation retry starts with the charge already taken.
  flow.skip_if(CheckoutStage::RequestIntent, |attempt| attempt.payment_intent_id.is_some());
  flow.skip_if(CheckoutStage::AuthorizePayment, |attempt| attempt.payment_intent_id.is_some());

  let svc = services.clone();
  flow.on(CheckoutStage::RequestIntent, move |state| request_intent(svc.clone(), state));

  flow.before(CheckoutStage::AuthorizePayment, |state: SharedState<CheckoutAttempt>| async move {
    state.write().transition(CheckoutState::GatewayAuthorizing);
    Ok::<_, CheckoutError>(FlowControl::Continue)
  });
  let svc = services.clone();
  flow.on(CheckoutStage::AuthorizePayment, move |state| authorize_payment(svc.clone(), state));

  let svc = services.clone();
  flow.on(CheckoutStage::ConfirmOrder, move |state| confirm_order(svc.clone(), state));

  let svc = services;
  flow.on(CheckoutStage::CommitLocal, move |state| commit_local(svc.clone(), state));

  flow
}

fn broken_invariant(message: &'static str) -> CheckoutError {
  CheckoutError::from(FlowError::from(anyhow!(message)))
}

/// The order, its type and the charged intent id, for the stages that run
/// after the gateway.
fn charged_order(state: &SharedState<CheckoutAttempt>) -> Result<(PendingOrder, CheckoutType, String), CheckoutError> {
  let attempt = state.read();
  let payment_intent_id = attempt
    .payment_intent_id
    .clone()
    .ok_or_else(|| broken_invariant("post-charge stage reached without a payment intent id"))?;
  Ok((attempt.order.clone(), attempt.checkout_type, payment_intent_id))
}

async fn request_intent(svc: Arc<Services>, state: SharedState<CheckoutAttempt>) -> StageResult {
  let (order, checkout_type) = {
    let attempt = state.read();
    (attempt.order.clone(), attempt.checkout_type)
  };

  let result = svc.intents.request_intent(&order, checkout_type).await;

  let mut attempt = state.write();
  match result {
    Ok(handle) => {
      attempt.intent = Some(handle);
      attempt.transition(CheckoutState::IntentRequested);
      Ok(FlowControl::Continue)
    }
    Err(err) => {
      attempt.fail(CheckoutState::IntentFailed, &err);
      Ok(FlowControl::Halt)
    }
  }
}

async fn authorize_payment(svc: Arc<Services>, state: SharedState<CheckoutAttempt>) -> StageResult {
  let (client_secret, payment_method) = {
    let attempt = state.read();
    (
      attempt.intent.as_ref().map(|intent| intent.client_secret.clone()),
      attempt.payment_method.clone(),
    )
  };
  let client_secret = client_secret.ok_or_else(|| broken_invariant("authorization reached without a payment intent"))?;
  let Some(payment_method) = payment_method else {
    let err = CheckoutError::GatewayRejected("No payment method was provided".to_string());
    state.write().fail(CheckoutState::GatewayFailed, &err);
    return Ok(FlowControl::Halt);
  };

  // No cancellation from here on: the gateway call runs to completion or timeout.
  let result = bounded(
    "gateway authorization",
    svc.settings.gateway_timeout,
    svc.gateway.confirm_card_payment(&client_secret, &payment_method),
  )
  .await
  .and_then(GatewayConfirmation::into_succeeded);

  let mut attempt = state.write();
  match result {
    Ok(payment_intent_id) => {
      attempt.payment_intent_id = Some(payment_intent_id);
      attempt.transition(CheckoutState::GatewaySucceeded);
      Ok(FlowControl::Continue)
    }
    Err(err) => {
      attempt.fail(CheckoutState::GatewayFailed, &err);
      Ok(FlowControl::Halt)
    }
  }
}

async fn confirm_order(svc: Arc<Services>, state: SharedState<CheckoutAttempt>) -> StageResult {
  let (order, checkout_type, payment_intent_id) = charged_order(&state)?;
  let amount = order.total_minor_units()?;

  if svc.committed.contains(&payment_intent_id) {
    event!(Level::WARN, %payment_intent_id, "Payment intent already committed, nothing to confirm again.");
    let receipt = receipt_for(&order, checkout_type, &payment_intent_id, amount, None, Vec::new(), true);
    let mut attempt = state.write();
    attempt.receipt = Some(receipt);
    attempt.transition(CheckoutState::BackendConfirmed);
    return Ok(FlowControl::Halt);
  }

  let request = ConfirmPaymentRequest::for_order(&order, checkout_type, &payment_intent_id, amount);
  let result = bounded(
    "backend confirmation",
    svc.settings.backend_timeout,
    svc.backend.confirm_payment(checkout_type, &request),
  )
  .await;

  match result {
    Ok(response) => {
      state.write().backend_message = response.message;
      Ok(FlowControl::Continue)
    }
    Err(cause) => {
      // The local cart/bookings stay untouched.
      svc.ledger.record(&order, checkout_type, &payment_intent_id, amount, cause.to_string());
      let err = CheckoutError::BackendConfirmFailedAfterCharge {
        payment_intent_id,
        reason: cause.to_string(),
      };
      state.write().fail(CheckoutState::BackendConfirmFailed, &err);
      Ok(FlowControl::Halt)
    }
  }
}

async fn commit_local(svc: Arc<Services>, state: SharedState<CheckoutAttempt>) -> StageResult {
  let (order, checkout_type, payment_intent_id) = charged_order(&state)?;
  let amount = order.total_minor_units()?;
  let resumed = state.read().resumed;
  let first_commit = svc.committed.insert(&payment_intent_id);

  let mut warnings = Vec::new();
  let mut confirmed_booking_ids = Vec::new();
  if first_commit {
    let timeout = svc.settings.backend_timeout;
    let charged_ids: Vec<String> = order.items.iter().map(|item| item.id.clone()).collect();
    let cleanup = match checkout_type {
      // The cart may have gained items while the charge was parked.
      CheckoutType::Cart if resumed => {
        let mut result = Ok(());
        for product_id in &charged_ids {
          if let Err(err) = bounded("cart item removal", timeout, svc.backend.remove_cart_item(product_id)).await {
            result = Err(err);
          }
        }
        result
      }
      CheckoutType::Cart => bounded("cart clear", timeout, svc.backend.clear_cart()).await,
      CheckoutType::Reservation if order.booking_ids.is_empty() => Ok(()),
      CheckoutType::Reservation => {
        let request = ConfirmBookingsRequest::for_order(&order);
        bounded("bookings confirmation", timeout, svc.backend.confirm_bookings(&request)).await
      }
    };
    if let Err(err) = cleanup {
      event!(Level::WARN, %payment_intent_id, error = %err, "Order recorded but backend cleanup failed.");
      warnings.push(format!("Order recorded, but cleanup failed: {}", err));
    }

    let action = match checkout_type {
      CheckoutType::Cart if resumed => CommitAction::RemoveCartItems(charged_ids),
      CheckoutType::Cart => CommitAction::ClearCart,
      CheckoutType::Reservation => {
        confirmed_booking_ids = order.booking_ids.clone();
        CommitAction::ConfirmBookings(order.booking_ids.clone())
      }
    };
    svc.store.write().commit(action);
  }

  if svc.ledger.resolve(&payment_intent_id).is_some() {
    event!(Level::INFO, %payment_intent_id, "Unresolved charge reconciled.");
  }

  let backend_message = state.read().backend_message.clone();
  let mut receipt = receipt_for(&order, checkout_type, &payment_intent_id, amount, backend_message, warnings, !first_commit);
  receipt.confirmed_booking_ids = confirmed_booking_ids;

  let callback = {
    let mut attempt = state.write();
    attempt.receipt = Some(receipt.clone());
    attempt.transition(CheckoutState::BackendConfirmed);
    if first_commit {
      attempt.on_success.take()
    } else {
      None
    }
  };
  if let Some(callback) = callback {
    callback(&receipt);
  }
  Ok(FlowControl::Continue)
}

fn receipt_for(
  order: &PendingOrder,
  checkout_type: CheckoutType,
  payment_intent_id: &str,
  amount_minor_units: i64,
  backend_message: Option<String>,
  warnings: Vec<String>,
  duplicate: bool,
) -> CheckoutReceipt {
  CheckoutReceipt {
    order_key: order.order_key,
    payment_intent_id: payment_intent_id.to_string(),
    checkout_type,
    amount_minor_units,
    currency: order.currency.clone(),
    items: order.items.clone(),
    confirmed_booking_ids: Vec::new(),
    backend_message,
    warnings,
    duplicate,
  }
}
