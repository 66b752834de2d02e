// checkout_service/src/main.rs

mod config;
mod errors;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use crafthub_checkout::{HttpBackend, HttpBackendConfig, StripeConfig, StripeGateway};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  if json {
    builder.json().init();
  } else {
    builder.init();
  }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  // LOG_FORMAT is read before the config so config errors are logged in the chosen format.
  dotenvy::dotenv().ok();
  let json_logs = std::env::var("LOG_FORMAT").map(|f| f.eq_ignore_ascii_case("json")).unwrap_or(false);
  init_tracing(json_logs);

  tracing::info!("Starting CraftHub checkout service...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let backend = HttpBackend::new(HttpBackendConfig {
    base_url: app_config.backend_base_url.clone(),
    token: app_config.backend_token.clone(),
    timeout: app_config.backend_timeout,
  })
  .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

  let mut stripe_config = StripeConfig::new(app_config.stripe_publishable_key.clone());
  stripe_config.api_base = app_config.stripe_api_base.clone();
  stripe_config.timeout = app_config.gateway_timeout;
  let gateway = StripeGateway::new(stripe_config).map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

  let app_state = AppState::from_config(&app_config, Arc::new(backend), Arc::new(gateway));

  // Background refresh of cart and bookings, stopped once the server exits.
  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let poller = app_state.sync.clone().spawn_polling(app_config.refresh_interval, shutdown_rx);

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  let server_state = app_state.clone();
  let result = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(server_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await;

  let _ = shutdown_tx.send(true);
  if let Err(e) = poller.await {
    tracing::warn!(error = %e, "Store polling task ended abnormally.");
  }
  let unresolved = app_state.reconciler.unresolved();
  if !unresolved.is_empty() {
    tracing::warn!(count = unresolved.len(), "Shutting down with charges the backend has not recorded.");
  }
  result
}
