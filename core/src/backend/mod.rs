// crafthub-checkout/src/backend/mod.rs

//! The marketplace REST backend as seen by checkout.
//!
//! The backend owns cart and booking persistence and is the authority on
//! prices: it recomputes the total of every intent request and refuses amounts
//! that disagree with its own catalog.

pub mod dto;
pub mod http;

use async_trait::async_trait;

use crate::error::CheckoutResult;
use crate::model::{CartEntry, CheckoutType, WorkshopBooking};

pub use dto::{
  ConfirmBookingsRequest, ConfirmPaymentRequest, ConfirmPaymentResponse, CreatePaymentIntentRequest,
  CreatePaymentIntentResponse, ItemDto,
};
pub use http::{HttpBackend, HttpBackendConfig};

#[async_trait]
pub trait CheckoutBackend: Send + Sync {
  /// `POST /payments/create-payment-intent`
  async fn create_payment_intent(&self, request: &CreatePaymentIntentRequest) -> CheckoutResult<CreatePaymentIntentResponse>;

  /// `POST /payments/confirm-payment` for carts, `/payments/confirm-payment-res`
  /// for reservations. Must be idempotent for a given payment intent id.
  async fn confirm_payment(
    &self,
    checkout_type: CheckoutType,
    request: &ConfirmPaymentRequest,
  ) -> CheckoutResult<ConfirmPaymentResponse>;

  /// `GET /cart`
  async fn get_cart(&self) -> CheckoutResult<Vec<CartEntry>>;

  /// `DELETE /cart/remove/:productId`
  async fn remove_cart_item(&self, product_id: &str) -> CheckoutResult<()>;

  /// `POST /cart/clear`
  async fn clear_cart(&self) -> CheckoutResult<()>;

  /// `GET /bookings`, pending reservations only.
  async fn get_bookings(&self) -> CheckoutResult<Vec<WorkshopBooking>>;

  /// `DELETE /bookings/remove/:id`
  async fn remove_booking(&self, booking_id: &str) -> CheckoutResult<()>;

  /// `POST /bookings/confirm`
  async fn confirm_bookings(&self, request: &ConfirmBookingsRequest) -> CheckoutResult<()>;
}
