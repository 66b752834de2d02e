// crafthub-checkout/src/store/sync.rs

//! Keeps the local store in line with the backend.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{event, instrument, Level};

use super::StoreHandle;
use crate::backend::CheckoutBackend;
use crate::bounded::bounded;
use crate::error::CheckoutResult;
use crate::guard::InFlightRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
  Refreshed { revision: u64 },
  /// A checkout was running, or committed while the fetch was out; the
  /// fetched lists were discarded.
  Skipped,
}

pub struct StoreSync {
  backend: Arc<dyn CheckoutBackend>,
  store: StoreHandle,
  in_flight: Arc<InFlightRegistry>,
  timeout: Duration,
}

impl StoreSync {
  pub fn new(backend: Arc<dyn CheckoutBackend>, store: StoreHandle, in_flight: Arc<InFlightRegistry>, timeout: Duration) -> Self {
    Self {
      backend,
      store,
      in_flight,
      timeout,
    }
  }

  pub fn store(&self) -> &StoreHandle {
    &self.store
  }

  /// Re-fetches cart and bookings and replaces the local lists.
  #[instrument(name = "StoreSync::refresh", skip_all)]
  pub async fn refresh(&self) -> CheckoutResult<RefreshOutcome> {
    if self.in_flight.any_in_flight() {
      event!(Level::DEBUG, "Checkout in flight, refresh skipped.");
      return Ok(RefreshOutcome::Skipped);
    }
    let revision_before = self.store.read().revision();

    let (cart, bookings) = tokio::join!(
      bounded("cart fetch", self.timeout, self.backend.get_cart()),
      bounded("bookings fetch", self.timeout, self.backend.get_bookings()),
    );
    let (cart, bookings) = (cart?, bookings?);

    if self.in_flight.any_in_flight() {
      return Ok(RefreshOutcome::Skipped);
    }
    let mut store = self.store.write();
    if store.revision() != revision_before {
      event!(Level::DEBUG, "Store changed during refresh, fetched lists discarded.");
      return Ok(RefreshOutcome::Skipped);
    }
    store.replace_cart(cart);
    store.replace_bookings(bookings);
    Ok(RefreshOutcome::Refreshed {
      revision: store.revision(),
    })
  }

  /// Removes one product from the cart, remotely then locally.
  #[instrument(name = "StoreSync::remove_cart_item", skip(self))]
  pub async fn remove_cart_item(&self, product_id: &str) -> CheckoutResult<bool> {
    bounded("cart item removal", self.timeout, self.backend.remove_cart_item(product_id)).await?;
    Ok(self.store.write().remove_cart_entry(product_id))
  }

  /// Cancels one pending booking, expired or not.
  #[instrument(name = "StoreSync::cancel_booking", skip(self))]
  pub async fn cancel_booking(&self, booking_id: &str) -> CheckoutResult<bool> {
    bounded("booking cancellation", self.timeout, self.backend.remove_booking(booking_id)).await?;
    Ok(self.store.write().remove_booking(booking_id))
  }

  async fn poll_once(&self) -> anyhow::Result<RefreshOutcome> {
    self.refresh().await.context("periodic cart/bookings refresh failed")
  }

  /// Refreshes every `interval` until `shutdown` flips to `true` or its
  /// sender is dropped. Failures are logged and the loop keeps going.
  pub fn spawn_polling(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(interval);
      ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
      event!(Level::INFO, interval_secs = interval.as_secs(), "Store polling started.");
      loop {
        tokio::select! {
          _ = ticker.tick() => {
            match self.poll_once().await {
              Ok(outcome) => event!(Level::TRACE, ?outcome, "Store poll finished."),
              Err(e) => event!(Level::WARN, error = format!("{:#}", e), "Store poll failed."),
            }
          }
          changed = shutdown.changed() => {
            if changed.is_err() || *shutdown.borrow() {
              break;
            }
          }
        }
      }
      event!(Level::INFO, "Store polling stopped.");
    })
  }
}
