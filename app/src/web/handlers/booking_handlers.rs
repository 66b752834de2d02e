// checkout_service/src/web/handlers/booking_handlers.rs

use actix_web::{web, HttpResponse};
use crafthub_checkout::{format_amount, WorkshopBooking, WorkshopStatus};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingView {
  #[serde(flatten)]
  booking: WorkshopBooking,
  status: WorkshopStatus,
}

/// Pending bookings with their status; totals cover upcoming ones only.
#[instrument(name = "handler::list_bookings", skip(app_state))]
pub async fn list_bookings_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let currency = app_state.settings.currency.clone();
  let classifier = &app_state.classifier;
  let (bookings, aggregate) = {
    let store = app_state.sync.store().read();
    let views: Vec<BookingView> = store
      .bookings()
      .iter()
      .map(|booking| BookingView {
        status: classifier.status(booking.scheduled_at),
        booking: booking.clone(),
      })
      .collect();
    (views, store.reservation_aggregate(currency.clone(), classifier))
  };
  let total_minor_units = aggregate.total_minor_units()?;

  Ok(HttpResponse::Ok().json(json!({
    "bookings": bookings,
    "activeCount": aggregate.active_count(),
    "excluded": aggregate.excluded,
    "totalMinorUnits": total_minor_units,
    "total": format_amount(total_minor_units, &currency),
    "currency": currency,
  })))
}

#[instrument(name = "handler::cancel_booking", skip(app_state, path), fields(booking_id = %path.as_str()))]
pub async fn cancel_booking_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let booking_id = path.into_inner();
  let removed = app_state.sync.cancel_booking(&booking_id).await?;
  if !removed {
    return Err(AppError::NotFound(format!("Booking '{}' is not pending", booking_id)));
  }
  info!(booking_id = %booking_id, "Booking cancelled.");
  Ok(HttpResponse::NoContent().finish())
}
