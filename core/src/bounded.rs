// crafthub-checkout/src/bounded.rs

//! Bounded waits for remote calls.

use std::future::Future;
use std::time::Duration;
use tracing::{event, Level};

use crate::error::{CheckoutError, CheckoutResult};

/// Awaits `fut` for at most `limit`.
///
/// Running out of time yields [`CheckoutError::Timeout`], which is distinct
/// from a network failure: the remote side may still have acted.
pub async fn bounded<T, F>(operation: &'static str, limit: Duration, fut: F) -> CheckoutResult<T>
where
  F: Future<Output = CheckoutResult<T>>,
{
  match tokio::time::timeout(limit, fut).await {
    Ok(result) => result,
    Err(_) => {
      event!(Level::WARN, operation, limit_ms = limit.as_millis() as u64, "Remote call timed out.");
      Err(CheckoutError::Timeout { operation })
    }
  }
}
