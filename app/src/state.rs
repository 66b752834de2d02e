// checkout_service/src/state.rs
use crate::config::AppConfig;
use crafthub_checkout::{
  CheckoutBackend, CheckoutSettings, CheckoutStore, ExpiryClassifier, InFlightRegistry, PaymentGateway, Reconciler,
  StoreSync,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub reconciler: Arc<Reconciler>,
  pub sync: Arc<StoreSync>,
  pub classifier: ExpiryClassifier,
  pub settings: CheckoutSettings,
}

impl AppState {
  /// Wires one shared store and in-flight registry between the reconciler and
  /// the store refresher.
  pub fn build(
    backend: Arc<dyn CheckoutBackend>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
    classifier: ExpiryClassifier,
  ) -> Self {
    let store = CheckoutStore::default().shared();
    let in_flight = InFlightRegistry::new();
    let reconciler = Arc::new(Reconciler::with_in_flight(
      backend.clone(),
      gateway,
      store.clone(),
      settings.clone(),
      in_flight.clone(),
    ));
    let sync = Arc::new(StoreSync::new(backend, store, in_flight, settings.backend_timeout));
    Self {
      reconciler,
      sync,
      classifier,
      settings,
    }
  }

  pub fn from_config(
    config: &AppConfig,
    backend: Arc<dyn CheckoutBackend>,
    gateway: Arc<dyn PaymentGateway>,
  ) -> Self {
    let settings = config.checkout_settings();
    let classifier = ExpiryClassifier::system(settings.expiry_policy);
    Self::build(backend, gateway, settings, classifier)
  }
}
