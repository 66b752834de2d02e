// crafthub-checkout/src/settings.rs
use std::time::Duration;

use crate::expiry::ExpiryPolicy;
use crate::money::Currency;

/// Knobs shared by the reconciler and the store refresher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
  pub currency: Currency,
  /// Upper bound on one gateway confirmation, 3-D Secure included.
  pub gateway_timeout: Duration,
  /// Upper bound on each backend call.
  pub backend_timeout: Duration,
  pub refresh_interval: Duration,
  pub expiry_policy: ExpiryPolicy,
}

impl Default for CheckoutSettings {
  fn default() -> Self {
    Self {
      currency: Currency::eur(),
      gateway_timeout: Duration::from_secs(60),
      backend_timeout: Duration::from_secs(15),
      refresh_interval: Duration::from_secs(15),
      expiry_policy: ExpiryPolicy::Instant,
    }
  }
}
