// crafthub-checkout/src/store/mod.rs

//! The buyer's cart and pending bookings, held locally.
//!
//! Refreshes replace the lists wholesale. The only mutation a checkout makes is
//! [`CheckoutStore::commit`].

pub mod sync;

use serde::Serialize;
use tracing::{event, Level};
use uuid::Uuid;

use crate::aggregate::{build_cart_order, build_reservation_order, Aggregate};
use crate::expiry::ExpiryClassifier;
use crate::flow::SharedState;
use crate::model::{CartEntry, CheckoutType, DeliveryInfo, WorkshopBooking};
use crate::money::Currency;

pub use sync::{RefreshOutcome, StoreSync};

/// Handle shared by the reconciler, the refresher and request handlers.
pub type StoreHandle = SharedState<CheckoutStore>;

/// The one change a successful checkout applies to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitAction {
  ClearCart,
  /// Only these products leave the cart; anything added since stays.
  RemoveCartItems(Vec<String>),
  ConfirmBookings(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutStore {
  cart: Vec<CartEntry>,
  bookings: Vec<WorkshopBooking>,
  revision: u64,
  #[serde(skip)]
  cart_key: Uuid,
  #[serde(skip)]
  reservation_key: Uuid,
}

impl Default for CheckoutStore {
  fn default() -> Self {
    Self::new(Vec::new(), Vec::new())
  }
}

impl CheckoutStore {
  pub fn new(cart: Vec<CartEntry>, bookings: Vec<WorkshopBooking>) -> Self {
    Self {
      cart,
      bookings,
      revision: 0,
      cart_key: Uuid::new_v4(),
      reservation_key: Uuid::new_v4(),
    }
  }

  pub fn shared(self) -> StoreHandle {
    SharedState::new(self)
  }

  pub fn cart(&self) -> &[CartEntry] {
    &self.cart
  }

  pub fn bookings(&self) -> &[WorkshopBooking] {
    &self.bookings
  }

  /// Bumped on every change.
  pub fn revision(&self) -> u64 {
    self.revision
  }

  /// Identity of the pending order of the given type. Stays the same until
  /// that order is committed, so repeated submits of one cart share a key.
  pub fn order_key(&self, checkout_type: CheckoutType) -> Uuid {
    match checkout_type {
      CheckoutType::Cart => self.cart_key,
      CheckoutType::Reservation => self.reservation_key,
    }
  }

  pub fn replace_cart(&mut self, cart: Vec<CartEntry>) {
    self.cart = cart;
    self.revision += 1;
  }

  pub fn replace_bookings(&mut self, bookings: Vec<WorkshopBooking>) {
    self.bookings = bookings;
    self.revision += 1;
  }

  pub fn remove_cart_entry(&mut self, product_id: &str) -> bool {
    let before = self.cart.len();
    self.cart.retain(|entry| entry.product_id != product_id);
    self.touch_if(before != self.cart.len())
  }

  pub fn remove_booking(&mut self, booking_id: &str) -> bool {
    let before = self.bookings.len();
    self.bookings.retain(|booking| booking.booking_id != booking_id);
    self.touch_if(before != self.bookings.len())
  }

  fn touch_if(&mut self, changed: bool) -> bool {
    if changed {
      self.revision += 1;
    }
    changed
  }

  /// Applies the local side of a confirmed checkout and rotates the order key
  /// of the committed order type.
  pub fn commit(&mut self, action: CommitAction) {
    match action {
      CommitAction::ClearCart => {
        event!(Level::INFO, cleared = self.cart.len(), "Committing checkout: cart cleared.");
        self.cart.clear();
        self.cart_key = Uuid::new_v4();
      }
      CommitAction::RemoveCartItems(ids) => {
        self.cart.retain(|entry| !ids.contains(&entry.product_id));
        event!(Level::INFO, removed = ids.len(), remaining = self.cart.len(), "Committing checkout: charged items removed from cart.");
        self.cart_key = Uuid::new_v4();
      }
      CommitAction::ConfirmBookings(ids) => {
        self.bookings.retain(|booking| !ids.contains(&booking.booking_id));
        event!(Level::INFO, confirmed = ids.len(), remaining = self.bookings.len(), "Committing checkout: bookings confirmed.");
        self.reservation_key = Uuid::new_v4();
      }
    }
    self.revision += 1;
  }

  /// The cart as a pending order, keyed by the current cart key.
  pub fn cart_aggregate(&self, currency: Currency, delivery_info: Option<DeliveryInfo>) -> Aggregate {
    let mut aggregate = build_cart_order(&self.cart, currency, delivery_info);
    aggregate.order.order_key = self.cart_key;
    aggregate
  }

  /// Pending bookings as an order, keyed by the current reservation key.
  pub fn reservation_aggregate(&self, currency: Currency, classifier: &ExpiryClassifier) -> Aggregate {
    let mut aggregate = build_reservation_order(&self.bookings, currency, classifier);
    aggregate.order.order_key = self.reservation_key;
    aggregate
  }
}
