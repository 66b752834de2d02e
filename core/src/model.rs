// crafthub-checkout/src/model.rs

//! Checkout data model: raw cart/booking rows as the backend stores them, and
//! the normalized pending order built from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CheckoutResult;
use crate::money::{to_minor_units, Currency};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
  Product,
  Workshop,
}

/// Which backend flow a payment belongs to. Serialized exactly as the
/// backend expects it in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutType {
  Cart,
  Reservation,
}

impl CheckoutType {
  pub fn item_kind(self) -> ItemKind {
    match self {
      CheckoutType::Cart => ItemKind::Product,
      CheckoutType::Reservation => ItemKind::Workshop,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      CheckoutType::Cart => "cart",
      CheckoutType::Reservation => "reservation",
    }
  }
}

impl fmt::Display for CheckoutType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Contact details for a shipped cart order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
  pub phone: String,
  pub address: String,
}

impl DeliveryInfo {
  /// Both fields must carry something; a blank form is no delivery info.
  pub fn is_complete(&self) -> bool {
    !self.phone.trim().is_empty() && !self.address.trim().is_empty()
  }
}

/// One row of the buyer's persisted cart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
  pub product_id: String,
  pub name: String,
  pub price: Decimal,
  pub quantity: i64,
  pub artisan_id: String,
}

/// One pending workshop reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkshopBooking {
  pub booking_id: String,
  pub workshop_id: String,
  pub title: String,
  pub scheduled_at: Option<DateTime<Utc>>,
  pub unit_price: Decimal,
  pub quantity: i64,
  pub places_remaining: Option<i64>,
  pub artisan_id: String,
}

/// One purchasable unit of a pending order. Only ever built by the
/// aggregator, so `unit_price >= 0` and `quantity >= 1` hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
  pub id: String,
  pub display_name: String,
  pub unit_price: Decimal,
  pub quantity: u32,
  pub owner_id: String,
  pub kind: ItemKind,
}

impl OrderLineItem {
  pub fn line_total(&self) -> Decimal {
    self.unit_price * Decimal::from(self.quantity)
  }
}

/// An in-progress checkout.
///
/// The total is never stored: [`PendingOrder::total_minor_units`] recomputes
/// it from `items` on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
  /// Identity of this checkout, used to keep one attempt in flight at a time.
  pub order_key: Uuid,
  pub kind: ItemKind,
  pub items: Vec<OrderLineItem>,
  pub delivery_info: Option<DeliveryInfo>,
  pub currency: Currency,
  /// Reservations this order settles, in item order. Empty for carts.
  pub booking_ids: Vec<String>,
}

impl PendingOrder {
  pub fn total_major(&self) -> Decimal {
    self.items.iter().map(OrderLineItem::line_total).sum()
  }

  pub fn total_minor_units(&self) -> CheckoutResult<i64> {
    to_minor_units(self.total_major())
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

/// Authorization handle returned when a payment intent is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntentHandle {
  pub client_secret: String,
  pub amount_minor_units: i64,
  pub currency: Currency,
}

impl PaymentIntentHandle {
  pub fn payment_intent_id(&self) -> Option<&str> {
    intent_id_from_client_secret(&self.client_secret)
  }
}

/// Client secrets have the form `pi_<id>_secret_<nonce>`; the intent id is the
/// part before `_secret_`.
pub fn intent_id_from_client_secret(client_secret: &str) -> Option<&str> {
  client_secret
    .split_once("_secret_")
    .map(|(id, _)| id)
    .filter(|id| id.starts_with("pi_"))
}

/// What the buyer pays with, as tokenized by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethod(pub String);

impl PaymentMethod {
  pub fn id(&self) -> &str {
    &self.0
  }
}
