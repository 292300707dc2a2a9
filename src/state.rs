//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: el document store y los services de larga
//! vida construidos sobre él.

use std::sync::Arc;

use crate::config::EnvironmentConfig;
use crate::services::{
    CommissionRateProvider, CommissionService, GeocodingService, NotificationService,
    OfferService, RoutingService, StoredRateProvider, TrackingService, TripService,
};
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub store: Arc<dyn DocumentStore>,
    pub geocoding: Arc<GeocodingService>,
    pub routing: Arc<RoutingService>,
    pub notifications: Arc<NotificationService>,
    pub trip_service: Arc<TripService>,
    pub offer_service: Arc<OfferService>,
    pub commission_service: Arc<CommissionService>,
    pub tracking: Arc<TrackingService>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn DocumentStore>) -> Self {
        let geocoding = Arc::new(GeocodingService::new(
            config.nominatim_base_url.clone(),
            config.nominatim_country_code.clone(),
        ));
        let routing = Arc::new(RoutingService::new(config.osrm_base_url.clone()));
        let notifications = Arc::new(NotificationService::new(store.clone()));

        // La tasa vigente se inyecta como proveedor explícito: la creación de
        // viajes la congela y el ledger solo la usa como fallback
        let rate_provider: Arc<dyn CommissionRateProvider> =
            Arc::new(StoredRateProvider::new(store.clone()));

        let trip_service = Arc::new(TripService::new(
            store.clone(),
            rate_provider.clone(),
            geocoding.clone(),
        ));
        let offer_service = Arc::new(OfferService::new(store.clone(), notifications.clone()));
        let commission_service =
            Arc::new(CommissionService::new(store.clone(), rate_provider));
        let tracking = Arc::new(TrackingService::new(
            store.clone(),
            trip_service.clone(),
            config.arrival_detector(),
        ));

        Self {
            config,
            store,
            geocoding,
            routing,
            notifications,
            trip_service,
            offer_service,
            commission_service,
            tracking,
        }
    }
}
