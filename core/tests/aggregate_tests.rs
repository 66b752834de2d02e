// tests/aggregate_tests.rs
mod common;

use chrono::Duration;
use common::*;
use crafthub_checkout::{
  build_cart_order, build_reservation_order, to_minor_units, Currency, ExclusionReason, ExpiryClassifier, ExpiryPolicy,
  ItemKind, WorkshopStatus,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn cart_total_matches_independent_computation_at_precision_edges() {
  let cases = vec![
    (vec![cart_entry("a", dec!(19.999), 1)], dec!(19.999)),
    (vec![cart_entry("a", dec!(0.005), 1)], dec!(0.005)),
    (vec![cart_entry("a", dec!(50.002), 2), cart_entry("b", dec!(0), 3)], dec!(100.004)),
  ];

  for (entries, expected_major) in cases {
    let independent: Decimal = entries.iter().map(|e| e.price * Decimal::from(e.quantity)).sum();
    assert_eq!(independent, expected_major);

    let aggregate = build_cart_order(&entries, Currency::eur(), None);
    assert_eq!(aggregate.total_minor_units().unwrap(), to_minor_units(independent).unwrap());
  }
}

#[test]
fn precision_edges_land_on_the_expected_cents() {
  let total = |price| build_cart_order(&[cart_entry("a", price, 1)], Currency::eur(), None).total_minor_units().unwrap();
  assert_eq!(total(dec!(19.999)), 2000);
  assert_eq!(total(dec!(0.005)), 1);
  assert_eq!(total(dec!(100.004)), 10000);
}

#[test]
fn sample_cart_totals_6998_and_keeps_delivery_info() {
  let aggregate = build_cart_order(&sample_cart(), Currency::eur(), Some(delivery()));

  assert_eq!(aggregate.total_minor_units().unwrap(), 6998);
  assert_eq!(aggregate.order.delivery_info, Some(delivery()));
  assert_eq!(aggregate.order.kind, ItemKind::Product);
  let ids: Vec<&str> = aggregate.order.items.iter().map(|i| i.id.as_str()).collect();
  assert_eq!(ids, vec!["vase", "bowl"]);
}

#[test]
fn converting_once_beats_rounding_each_line() {
  // Three lines of 0.005 each: 0.015 rounds to 2 cents, per-line rounding would give 3.
  let entries = vec![
    cart_entry("a", dec!(0.005), 1),
    cart_entry("b", dec!(0.005), 1),
    cart_entry("c", dec!(0.005), 1),
  ];
  let aggregate = build_cart_order(&entries, Currency::eur(), None);
  assert_eq!(aggregate.total_minor_units().unwrap(), 2);
}

#[test]
fn only_the_active_booking_is_payable() {
  let classifier = ExpiryClassifier::fixed(fixed_now());
  let bookings = vec![booking("past", dec!(35.00), 2, -1), booking("next", dec!(42.50), 1, 3)];

  let aggregate = build_reservation_order(&bookings, Currency::eur(), &classifier);

  assert_eq!(aggregate.active_count(), 1);
  assert_eq!(aggregate.order.booking_ids, vec!["next".to_string()]);
  assert_eq!(aggregate.total_minor_units().unwrap(), 4250);
  assert_eq!(aggregate.excluded.len(), 1);
  assert_eq!(aggregate.excluded[0].id, "past");
  assert_eq!(aggregate.excluded[0].reason, ExclusionReason::Expired);
}

#[test]
fn source_bookings_are_left_untouched() {
  let classifier = ExpiryClassifier::fixed(fixed_now());
  let bookings = vec![booking("past", dec!(35.00), 1, -1), booking("next", dec!(20.00), 1, 1)];
  let snapshot = bookings.clone();

  let _ = build_reservation_order(&bookings, Currency::eur(), &classifier);

  assert_eq!(bookings, snapshot);
}

#[test]
fn calendar_day_policy_excludes_later_today() {
  let classifier = ExpiryClassifier::fixed(fixed_now()).with_policy(ExpiryPolicy::CalendarDay);
  let mut later_today = booking("tonight", dec!(15.00), 1, 0);
  later_today.scheduled_at = Some(fixed_now() + Duration::hours(5));

  let aggregate = build_reservation_order(&[later_today], Currency::eur(), &classifier);
  assert_eq!(aggregate.active_count(), 0);
}

#[test]
fn expiry_predicate_and_status_agree_on_bookings() {
  let classifier = ExpiryClassifier::fixed(fixed_now());
  for days in -3..=3 {
    let row = booking("b", dec!(10), 1, days);
    let expired = classifier.is_expired(row.scheduled_at);
    let status = classifier.status(row.scheduled_at);
    assert_eq!(expired, status == WorkshopStatus::Expired, "disagreement at {} days", days);
  }
}
