// crafthub-checkout/src/money.rs

//! Amount normalization.
//!
//! Prices travel as major-unit decimals (`29.99` euros) and the gateway wants
//! integer minor units (`2999` cents). All arithmetic happens on
//! `rust_decimal::Decimal`; floats never touch money.

use crate::error::{CheckoutError, CheckoutResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minor units per major unit. Every currency CraftHub sells in has two
/// fractional digits.
const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Converts a major-unit amount to integer minor units, rounding half-up.
///
/// `95.99 -> 9599`, `64.835 -> 6484`, `0.005 -> 1`. Negative amounts are
/// rejected, never clamped.
pub fn to_minor_units(amount_major: Decimal) -> CheckoutResult<i64> {
  if amount_major < Decimal::ZERO {
    return Err(CheckoutError::InvalidAmount(format!(
      "{} is negative",
      amount_major
    )));
  }

  // On a non-negative value, away-from-zero at the midpoint is half-up.
  amount_major
    .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
    .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    .and_then(|rounded| rounded.to_i64())
    .ok_or_else(|| CheckoutError::InvalidAmount(format!("{} is out of range", amount_major)))
}

/// The major-unit value of an integer minor-unit amount, at scale 2.
pub fn from_minor_units(minor: i64) -> Decimal {
  Decimal::new(minor, 2)
}

/// Display form used in logs and receipts: `"69.98 EUR"`.
pub fn format_amount(minor: i64, currency: &Currency) -> String {
  format!("{} {}", from_minor_units(minor), currency)
}

/// An ISO-4217 currency code, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
  pub fn new(code: &str) -> CheckoutResult<Self> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
      return Err(CheckoutError::InvalidCurrency(code.to_string()));
    }
    Ok(Currency(code.to_ascii_uppercase()))
  }

  pub fn eur() -> Self {
    Currency("EUR".to_string())
  }

  pub fn code(&self) -> &str {
    &self.0
  }
}

impl Default for Currency {
  fn default() -> Self {
    Currency::eur()
  }
}

impl fmt::Display for Currency {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for Currency {
  type Err = CheckoutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Currency::new(s)
  }
}

impl TryFrom<String> for Currency {
  type Error = CheckoutError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Currency::new(&value)
  }
}

impl From<Currency> for String {
  fn from(currency: Currency) -> Self {
    currency.0
  }
}
