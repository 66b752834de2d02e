// src/lib.rs

//! CraftHub checkout: payment confirmation and order/booking reconciliation.
//!
//! The crate turns a buyer's cart or pending workshop bookings into a payable
//! order and walks it through the payment handshake:
//!  - Amount normalization to integer minor units, rounding half-up.
//!  - Aggregation of cart rows and bookings, leaving out invalid and expired ones.
//!  - Payment intent requests against the marketplace backend.
//!  - Gateway authorization, backend confirmation and one local commit.
//!  - A ledger of charges the backend failed to record, with explicit retry.
//!
//! The reconciler is built on a small step-flow engine ([`flow`]) with
//! before/on/after handlers per stage.

pub mod aggregate;
pub mod backend;
pub mod bounded;
pub mod error;
pub mod expiry;
pub mod flow;
pub mod gateway;
pub mod guard;
pub mod intent;
pub mod model;
pub mod money;
pub mod reconciler;
pub mod settings;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::aggregate::{build_cart_order, build_pending_order, build_reservation_order, Aggregate, Exclusion, ExclusionReason};
pub use crate::backend::{CheckoutBackend, HttpBackend, HttpBackendConfig};
pub use crate::error::{CheckoutError, CheckoutResult, ErrorKind, FlowError};
pub use crate::expiry::{Clock, ExpiryClassifier, ExpiryPolicy, FixedClock, SystemClock, WorkshopStatus};
pub use crate::flow::{Flow, FlowControl, FlowOutcome, SharedState};
pub use crate::gateway::{GatewayConfirmation, IntentStatus, PaymentGateway, StripeConfig, StripeGateway};
pub use crate::guard::InFlightRegistry;
pub use crate::intent::PaymentIntentClient;
pub use crate::model::{
  CartEntry, CheckoutType, DeliveryInfo, ItemKind, OrderLineItem, PaymentIntentHandle, PaymentMethod, PendingOrder,
  WorkshopBooking,
};
pub use crate::money::{format_amount, from_minor_units, to_minor_units, Currency};
pub use crate::reconciler::{
  CheckoutFailure, CheckoutReceipt, CheckoutReport, CheckoutRequest, CheckoutState, Reconciler, UnresolvedCharge,
};
pub use crate::settings::CheckoutSettings;
pub use crate::store::{CheckoutStore, CommitAction, RefreshOutcome, StoreHandle, StoreSync};
