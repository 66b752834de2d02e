// crafthub-checkout/src/reconciler/committed.rs

//! Recently committed payment intents, for spotting repeat confirmations.
//!
//! Capped: once full, the oldest intent is forgotten. A confirmation repeated
//! after that is still recorded once, since the backend deduplicates on the
//! payment intent id.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

pub(crate) const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Default)]
struct Entries {
  ids: HashSet<String>,
  order: VecDeque<String>,
}

#[derive(Debug)]
pub(crate) struct CommittedIntents {
  capacity: usize,
  entries: Mutex<Entries>,
}

impl Default for CommittedIntents {
  fn default() -> Self {
    Self::with_capacity(DEFAULT_CAPACITY)
  }
}

impl CommittedIntents {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      capacity: capacity.max(1),
      entries: Mutex::new(Entries::default()),
    }
  }

  pub fn contains(&self, payment_intent_id: &str) -> bool {
    self.entries.lock().ids.contains(payment_intent_id)
  }

  /// False when the intent was already present.
  pub fn insert(&self, payment_intent_id: &str) -> bool {
    let mut entries = self.entries.lock();
    if !entries.ids.insert(payment_intent_id.to_string()) {
      return false;
    }
    entries.order.push_back(payment_intent_id.to_string());
    while entries.order.len() > self.capacity {
      if let Some(oldest) = entries.order.pop_front() {
        entries.ids.remove(&oldest);
      }
    }
    true
  }

  pub fn len(&self) -> usize {
    self.entries.lock().order.len()
  }
}
