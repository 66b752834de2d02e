// checkout_service/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use crafthub_checkout::format_amount;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

/// The cart as the store currently sees it, with its pending total.
#[instrument(name = "handler::view_cart", skip(app_state))]
pub async fn view_cart_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let currency = app_state.settings.currency.clone();
  let (items, aggregate) = {
    let store = app_state.sync.store().read();
    (store.cart().to_vec(), store.cart_aggregate(currency.clone(), None))
  };
  let total_minor_units = aggregate.total_minor_units()?;

  Ok(HttpResponse::Ok().json(json!({
    "items": items,
    "excluded": aggregate.excluded,
    "totalMinorUnits": total_minor_units,
    "total": format_amount(total_minor_units, &currency),
    "currency": currency,
  })))
}

#[instrument(name = "handler::remove_cart_item", skip(app_state, path), fields(product_id = %path.as_str()))]
pub async fn remove_cart_item_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let product_id = path.into_inner();
  let removed = app_state.sync.remove_cart_item(&product_id).await?;
  if !removed {
    return Err(AppError::NotFound(format!("Product '{}' is not in the cart", product_id)));
  }
  info!(product_id = %product_id, "Cart item removed.");
  Ok(HttpResponse::NoContent().finish())
}
