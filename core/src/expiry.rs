// crafthub-checkout/src/expiry.rs

//! Workshop expiry classification.
//!
//! Every "is this workshop in the past?" question in the crate goes through
//! [`ExpiryClassifier::is_expired`]; [`ExpiryClassifier::status`] is derived
//! from it so the two can never disagree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::CheckoutError;

/// Source of "now". Tests inject a [`FixedClock`].
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}

/// How "in the past" is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryPolicy {
  /// Expired once the scheduled instant is strictly before now.
  #[default]
  Instant,
  /// Expired once the scheduled UTC calendar day is today or earlier.
  CalendarDay,
}

impl FromStr for ExpiryPolicy {
  type Err = CheckoutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "instant" => Ok(ExpiryPolicy::Instant),
      "calendar_day" | "calendar-day" => Ok(ExpiryPolicy::CalendarDay),
      other => Err(CheckoutError::Config(format!("Unknown expiry policy '{}'", other))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkshopStatus {
  Upcoming,
  Expired,
}

impl fmt::Display for WorkshopStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      WorkshopStatus::Upcoming => f.write_str("upcoming"),
      WorkshopStatus::Expired => f.write_str("expired"),
    }
  }
}

#[derive(Clone)]
pub struct ExpiryClassifier {
  clock: Arc<dyn Clock>,
  policy: ExpiryPolicy,
}

impl ExpiryClassifier {
  pub fn new(clock: Arc<dyn Clock>, policy: ExpiryPolicy) -> Self {
    Self { clock, policy }
  }

  /// Wall-clock classifier with the given policy.
  pub fn system(policy: ExpiryPolicy) -> Self {
    Self::new(Arc::new(SystemClock), policy)
  }

  /// Classifier pinned to `now`.
  pub fn fixed(now: DateTime<Utc>) -> Self {
    Self::new(Arc::new(FixedClock(now)), ExpiryPolicy::Instant)
  }

  pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn policy(&self) -> ExpiryPolicy {
    self.policy
  }

  /// A workshop without a known date is never considered expired.
  pub fn is_expired(&self, scheduled: Option<DateTime<Utc>>) -> bool {
    let Some(scheduled) = scheduled else {
      return false;
    };
    let now = self.clock.now();
    match self.policy {
      ExpiryPolicy::Instant => scheduled < now,
      ExpiryPolicy::CalendarDay => scheduled.date_naive() <= now.date_naive(),
    }
  }

  pub fn status(&self, scheduled: Option<DateTime<Utc>>) -> WorkshopStatus {
    if self.is_expired(scheduled) {
      WorkshopStatus::Expired
    } else {
      WorkshopStatus::Upcoming
    }
  }
}

impl fmt::Debug for ExpiryClassifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ExpiryClassifier")
      .field("policy", &self.policy)
      .finish_non_exhaustive()
  }
}
