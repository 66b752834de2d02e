// crafthub-checkout/src/aggregate.rs

//! Cart/booking aggregation.
//!
//! Turns the rows the buyer sees (cart entries, pending workshop bookings) into
//! a [`PendingOrder`]. Rows that cannot be paid for are left out of the order
//! and reported back as [`Exclusion`]s; the caller's rows are never mutated.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{event, Level};
use uuid::Uuid;

use crate::error::CheckoutResult;
use crate::expiry::ExpiryClassifier;
use crate::model::{CartEntry, DeliveryInfo, ItemKind, OrderLineItem, PendingOrder, WorkshopBooking};
use crate::money::Currency;

/// A source row in the shape the aggregator filters on.
#[derive(Debug, Clone, PartialEq)]
pub struct RawLine {
  pub id: String,
  pub display_name: String,
  pub unit_price: Decimal,
  pub quantity: i64,
  pub owner_id: String,
  pub scheduled_at: Option<DateTime<Utc>>,
  /// The reservation this row came from, for workshop rows.
  pub booking_id: Option<String>,
}

impl From<&CartEntry> for RawLine {
  fn from(entry: &CartEntry) -> Self {
    RawLine {
      id: entry.product_id.clone(),
      display_name: entry.name.clone(),
      unit_price: entry.price,
      quantity: entry.quantity,
      owner_id: entry.artisan_id.clone(),
      scheduled_at: None,
      booking_id: None,
    }
  }
}

impl From<&WorkshopBooking> for RawLine {
  fn from(booking: &WorkshopBooking) -> Self {
    RawLine {
      id: booking.workshop_id.clone(),
      display_name: booking.title.clone(),
      unit_price: booking.unit_price,
      quantity: booking.quantity,
      owner_id: booking.artisan_id.clone(),
      scheduled_at: booking.scheduled_at,
      booking_id: Some(booking.booking_id.clone()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExclusionReason {
  NegativePrice,
  InvalidQuantity,
  Expired,
}

/// A source row left out of the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
  /// Booking id for workshop rows, product id for cart rows.
  pub id: String,
  pub reason: ExclusionReason,
}

/// The result of aggregating one cart or booking list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
  pub order: PendingOrder,
  pub excluded: Vec<Exclusion>,
}

impl Aggregate {
  pub fn total_minor_units(&self) -> CheckoutResult<i64> {
    self.order.total_minor_units()
  }

  pub fn active_count(&self) -> usize {
    self.order.items.len()
  }

  pub fn is_excluded(&self, id: &str) -> bool {
    self.excluded.iter().any(|exclusion| exclusion.id == id)
  }
}

fn exclusion_reason(line: &RawLine, kind: ItemKind, classifier: Option<&ExpiryClassifier>) -> Option<ExclusionReason> {
  if line.unit_price < Decimal::ZERO {
    return Some(ExclusionReason::NegativePrice);
  }
  if line.quantity < 1 || u32::try_from(line.quantity).is_err() {
    return Some(ExclusionReason::InvalidQuantity);
  }
  if kind == ItemKind::Workshop && classifier.is_some_and(|c| c.is_expired(line.scheduled_at)) {
    return Some(ExclusionReason::Expired);
  }
  None
}

/// Builds a pending order from raw rows, preserving their order.
///
/// Workshop rows are checked for expiry only when a classifier is given.
pub fn build_pending_order(
  raw: &[RawLine],
  kind: ItemKind,
  currency: Currency,
  delivery_info: Option<DeliveryInfo>,
  classifier: Option<&ExpiryClassifier>,
) -> Aggregate {
  let mut items = Vec::with_capacity(raw.len());
  let mut booking_ids = Vec::new();
  let mut excluded = Vec::new();

  for line in raw {
    let reported_id = line.booking_id.clone().unwrap_or_else(|| line.id.clone());
    if let Some(reason) = exclusion_reason(line, kind, classifier) {
      event!(Level::DEBUG, id = %reported_id, ?reason, "Row excluded from pending order.");
      excluded.push(Exclusion { id: reported_id, reason });
      continue;
    }

    // exclusion_reason already rejected anything outside 1..=u32::MAX
    let quantity = u32::try_from(line.quantity).unwrap_or(1);
    items.push(OrderLineItem {
      id: line.id.clone(),
      display_name: line.display_name.clone(),
      unit_price: line.unit_price,
      quantity,
      owner_id: line.owner_id.clone(),
      kind,
    });
    if let Some(booking_id) = &line.booking_id {
      booking_ids.push(booking_id.clone());
    }
  }

  Aggregate {
    order: PendingOrder {
      order_key: Uuid::new_v4(),
      kind,
      items,
      delivery_info,
      currency,
      booking_ids,
    },
    excluded,
  }
}

/// Pending order for a cart checkout.
pub fn build_cart_order(entries: &[CartEntry], currency: Currency, delivery_info: Option<DeliveryInfo>) -> Aggregate {
  let raw: Vec<RawLine> = entries.iter().map(RawLine::from).collect();
  build_pending_order(&raw, ItemKind::Product, currency, delivery_info, None)
}

/// Pending order for a reservation checkout. Expired bookings are excluded.
pub fn build_reservation_order(
  bookings: &[WorkshopBooking],
  currency: Currency,
  classifier: &ExpiryClassifier,
) -> Aggregate {
  let raw: Vec<RawLine> = bookings.iter().map(RawLine::from).collect();
  build_pending_order(&raw, ItemKind::Workshop, currency, None, Some(classifier))
}
