// crafthub-checkout/src/reconciler/ledger.rs

//! Charges the gateway took that the backend never recorded.
//!
//! Entries stay until an explicit confirmation retry succeeds. They are never
//! retried in the background.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{CheckoutType, PendingOrder};
use crate::money::Currency;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedCharge {
  pub payment_intent_id: String,
  pub checkout_type: CheckoutType,
  pub amount_minor_units: i64,
  pub currency: Currency,
  pub order: PendingOrder,
  pub reason: String,
  pub first_failed_at: DateTime<Utc>,
  pub last_failed_at: DateTime<Utc>,
  pub failures: u32,
}

#[derive(Debug, Default)]
pub struct UnresolvedCharges {
  entries: Mutex<HashMap<String, UnresolvedCharge>>,
}

impl UnresolvedCharges {
  /// Records a failure for the charge, keeping the first failure time when
  /// the charge is already listed.
  pub fn record(&self, order: &PendingOrder, checkout_type: CheckoutType, payment_intent_id: &str, amount_minor_units: i64, reason: String) {
    let now = Utc::now();
    let mut entries = self.entries.lock();
    entries
      .entry(payment_intent_id.to_string())
      .and_modify(|entry| {
        entry.reason = reason.clone();
        entry.last_failed_at = now;
        entry.failures += 1;
      })
      .or_insert_with(|| UnresolvedCharge {
        payment_intent_id: payment_intent_id.to_string(),
        checkout_type,
        amount_minor_units,
        currency: order.currency.clone(),
        order: order.clone(),
        reason,
        first_failed_at: now,
        last_failed_at: now,
        failures: 1,
      });
  }

  pub fn get(&self, payment_intent_id: &str) -> Option<UnresolvedCharge> {
    self.entries.lock().get(payment_intent_id).cloned()
  }

  /// The parked charge of an order, if any.
  pub fn for_order(&self, order_key: Uuid) -> Option<UnresolvedCharge> {
    self
      .entries
      .lock()
      .values()
      .find(|entry| entry.order.order_key == order_key)
      .cloned()
  }

  pub fn resolve(&self, payment_intent_id: &str) -> Option<UnresolvedCharge> {
    self.entries.lock().remove(payment_intent_id)
  }

  /// Oldest first.
  pub fn list(&self) -> Vec<UnresolvedCharge> {
    let mut charges: Vec<UnresolvedCharge> = self.entries.lock().values().cloned().collect();
    charges.sort_by(|a, b| a.first_failed_at.cmp(&b.first_failed_at));
    charges
  }

  pub fn len(&self) -> usize {
    self.entries.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().is_empty()
  }
}
