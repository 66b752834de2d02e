// crafthub-checkout/src/guard.rs

//! At most one checkout attempt per pending order.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{event, Level};
use uuid::Uuid;

use crate::error::{CheckoutError, CheckoutResult};

#[derive(Debug, Default)]
pub struct InFlightRegistry {
  keys: Mutex<HashSet<Uuid>>,
}

impl InFlightRegistry {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Marks `order_key` busy until the returned guard is dropped.
  pub fn try_acquire(self: &Arc<Self>, order_key: Uuid) -> CheckoutResult<InFlightGuard> {
    if !self.keys.lock().insert(order_key) {
      event!(Level::WARN, %order_key, "Rejected a second checkout for an order already in flight.");
      return Err(CheckoutError::AttemptInFlight { order_key });
    }
    Ok(InFlightGuard {
      registry: Arc::clone(self),
      order_key,
    })
  }

  pub fn is_in_flight(&self, order_key: Uuid) -> bool {
    self.keys.lock().contains(&order_key)
  }

  pub fn any_in_flight(&self) -> bool {
    !self.keys.lock().is_empty()
  }
}

#[derive(Debug)]
pub struct InFlightGuard {
  registry: Arc<InFlightRegistry>,
  order_key: Uuid,
}

impl InFlightGuard {
  pub fn order_key(&self) -> Uuid {
    self.order_key
  }
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.registry.keys.lock().remove(&self.order_key);
  }
}
