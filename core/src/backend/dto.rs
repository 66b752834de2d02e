// crafthub-checkout/src/backend/dto.rs

//! Wire shapes of the marketplace REST backend.
//!
//! Field names follow the backend exactly (`_id`, `artisanId`, `amount_cents`,
//! ...). Prices go out as JSON numbers because that is what the backend stores.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{event, Level};

use crate::model::{CartEntry, CheckoutType, DeliveryInfo, OrderLineItem, PendingOrder, WorkshopBooking};
use crate::money::Currency;

/// Status string the backend accepts on a confirm call.
pub const STATUS_SUCCEEDED: &str = "succeeded";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDto {
  #[serde(rename = "_id")]
  pub id: String,
  pub name: String,
  #[serde(with = "rust_decimal::serde::float")]
  pub price: Decimal,
  pub quantity: u32,
  #[serde(rename = "artisanId")]
  pub artisan_id: String,
}

impl From<&OrderLineItem> for ItemDto {
  fn from(item: &OrderLineItem) -> Self {
    ItemDto {
      id: item.id.clone(),
      name: item.display_name.clone(),
      price: item.unit_price,
      quantity: item.quantity,
      artisan_id: item.owner_id.clone(),
    }
  }
}

/// Body of `POST /payments/create-payment-intent`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePaymentIntentRequest {
  pub amount_cents: i64,
  pub currency: Currency,
  #[serde(rename = "type")]
  pub checkout_type: CheckoutType,
  pub items: Vec<ItemDto>,
  #[serde(rename = "deliveryInfo", skip_serializing_if = "Option::is_none")]
  pub delivery_info: Option<DeliveryInfo>,
}

impl CreatePaymentIntentRequest {
  pub fn for_order(order: &PendingOrder, checkout_type: CheckoutType, amount_cents: i64) -> Self {
    CreatePaymentIntentRequest {
      amount_cents,
      currency: order.currency.clone(),
      checkout_type,
      items: order.items.iter().map(ItemDto::from).collect(),
      delivery_info: delivery_for(order, checkout_type),
    }
  }
}

/// Response of `POST /payments/create-payment-intent`.
///
/// Older backends only return the client secret; the amount and currency echo
/// is checked when present.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatePaymentIntentResponse {
  #[serde(rename = "clientSecret")]
  pub client_secret: String,
  #[serde(default)]
  pub amount_cents: Option<i64>,
  #[serde(default)]
  pub currency: Option<String>,
}

/// Body of `POST /payments/confirm-payment` and `/payments/confirm-payment-res`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmPaymentRequest {
  #[serde(rename = "paymentIntentId")]
  pub payment_intent_id: String,
  pub status: &'static str,
  pub amount_cents: i64,
  pub currency: Currency,
  #[serde(rename = "type")]
  pub checkout_type: CheckoutType,
  pub items: Vec<ItemDto>,
  #[serde(rename = "deliveryInfo", skip_serializing_if = "Option::is_none")]
  pub delivery_info: Option<DeliveryInfo>,
}

impl ConfirmPaymentRequest {
  pub fn for_order(order: &PendingOrder, checkout_type: CheckoutType, payment_intent_id: &str, amount_cents: i64) -> Self {
    ConfirmPaymentRequest {
      payment_intent_id: payment_intent_id.to_string(),
      status: STATUS_SUCCEEDED,
      amount_cents,
      currency: order.currency.clone(),
      checkout_type,
      items: order.items.iter().map(ItemDto::from).collect(),
      delivery_info: delivery_for(order, checkout_type),
    }
  }
}

fn delivery_for(order: &PendingOrder, checkout_type: CheckoutType) -> Option<DeliveryInfo> {
  match checkout_type {
    CheckoutType::Cart => order.delivery_info.clone(),
    CheckoutType::Reservation => None,
  }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ConfirmPaymentResponse {
  #[serde(default)]
  pub message: Option<String>,
}

/// Body of `POST /bookings/confirm`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmBookingsRequest {
  #[serde(rename = "bookingIds")]
  pub booking_ids: Vec<String>,
  pub items: Vec<BookingItemDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingItemDto {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "workshopId")]
  pub workshop_id: String,
  pub quantity: u32,
  #[serde(with = "rust_decimal::serde::float")]
  pub price: Decimal,
  pub title: String,
}

impl ConfirmBookingsRequest {
  pub fn for_order(order: &PendingOrder) -> Self {
    ConfirmBookingsRequest {
      booking_ids: order.booking_ids.clone(),
      items: order
        .items
        .iter()
        .map(|item| BookingItemDto {
          id: item.id.clone(),
          workshop_id: item.id.clone(),
          quantity: item.quantity,
          price: item.unit_price,
          title: item.display_name.clone(),
        })
        .collect(),
    }
  }
}

/// Error body the backend sends with non-2xx statuses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
  #[serde(default)]
  pub error: Option<String>,
  #[serde(default)]
  pub details: Option<String>,
}

impl ErrorBody {
  /// `details` is the more specific of the two when both are set.
  pub fn message(&self) -> Option<String> {
    self.details.clone().or_else(|| self.error.clone())
  }
}

fn default_quantity() -> i64 {
  1
}

/// Response of `GET /cart`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartDto {
  #[serde(default)]
  pub items: Vec<CartItemDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartItemDto {
  /// Populated product; `null` once the product has been deleted.
  #[serde(rename = "productId")]
  pub product: Option<CartProductDto>,
  #[serde(default = "default_quantity")]
  pub quantity: i64,
  #[serde(rename = "artisanId", default)]
  pub artisan_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartProductDto {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub price: Option<Decimal>,
  #[serde(rename = "artisanId", default)]
  pub artisan_id: Option<String>,
}

impl CartDto {
  /// Rows whose product no longer exists cannot be bought and are dropped.
  pub fn into_entries(self) -> Vec<CartEntry> {
    self
      .items
      .into_iter()
      .filter_map(|item| {
        let Some(product) = item.product else {
          event!(Level::DEBUG, "Cart row without a product dropped.");
          return None;
        };
        Some(CartEntry {
          name: product.name.unwrap_or_else(|| "Unknown product".to_string()),
          price: product.price.unwrap_or(Decimal::ZERO),
          quantity: item.quantity,
          artisan_id: product.artisan_id.or(item.artisan_id).unwrap_or_default(),
          product_id: product.id,
        })
      })
      .collect()
  }
}

/// One element of `GET /bookings`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingDto {
  #[serde(rename = "_id")]
  pub id: String,
  /// Populated workshop; `null` once the workshop has been deleted.
  #[serde(rename = "workshopId")]
  pub workshop: Option<WorkshopDto>,
  #[serde(default = "default_quantity")]
  pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkshopDto {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub price: Option<Decimal>,
  #[serde(default)]
  pub date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub places: Option<i64>,
  #[serde(rename = "artisanId", default)]
  pub artisan_id: Option<String>,
}

impl From<BookingDto> for WorkshopBooking {
  fn from(dto: BookingDto) -> Self {
    let workshop = dto.workshop;
    WorkshopBooking {
      booking_id: dto.id,
      workshop_id: workshop.as_ref().map(|w| w.id.clone()).unwrap_or_default(),
      title: workshop
        .as_ref()
        .and_then(|w| w.title.clone())
        .unwrap_or_else(|| "Unknown workshop".to_string()),
      scheduled_at: workshop.as_ref().and_then(|w| w.date),
      unit_price: workshop.as_ref().and_then(|w| w.price).unwrap_or(Decimal::ZERO),
      quantity: dto.quantity,
      places_remaining: workshop.as_ref().and_then(|w| w.places),
      artisan_id: workshop.and_then(|w| w.artisan_id).unwrap_or_default(),
    }
  }
}
