//! Helpers compartidos por los tests de integración
//!
//! Todos los tests corren contra el store en memoria; los services son los
//! mismos que usa el binario.
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;

use taxi_marketplace::models::trip::TripDoc;
use taxi_marketplace::models::{Destination, GeoPoint, VehicleType};
use taxi_marketplace::repositories::SettingsRepository;
use taxi_marketplace::services::tracking_service::ArrivalDetector;
use taxi_marketplace::services::trip_service::NewTripRequest;
use taxi_marketplace::services::{
    CommissionRateProvider, CommissionService, GeocodingService, NotificationService,
    OfferService, StoredRateProvider, TrackingService, TripService,
};
use taxi_marketplace::store::{DocumentStore, MemoryStore, WriteOp};

/// Punto de recogida usado por defecto en los tests (Ciudad Guayana)
pub const PICKUP: GeoPoint = GeoPoint {
    latitude: 8.2954,
    longitude: -62.7114,
};

/// Destino usado por defecto
pub const DROPOFF: GeoPoint = GeoPoint {
    latitude: 8.3596,
    longitude: -62.6517,
};

pub struct TestContext {
    pub store: Arc<dyn DocumentStore>,
    pub settings: SettingsRepository,
    pub trip_service: Arc<TripService>,
    pub offer_service: Arc<OfferService>,
    pub commission_service: Arc<CommissionService>,
    pub tracking: Arc<TrackingService>,
}

impl TestContext {
    pub fn new() -> Self {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        // Oráculo apuntando a ningún lado: los tests siempre pasan la
        // dirección de recogida explícita y nunca tocan la red
        let geocoding = Arc::new(GeocodingService::new(
            "http://127.0.0.1:1".to_string(),
            "ve".to_string(),
        ));
        let notifications = Arc::new(NotificationService::new(store.clone()));
        let rate_provider: Arc<dyn CommissionRateProvider> =
            Arc::new(StoredRateProvider::new(store.clone()));

        let trip_service = Arc::new(TripService::new(
            store.clone(),
            rate_provider.clone(),
            geocoding,
        ));
        let offer_service = Arc::new(OfferService::new(store.clone(), notifications));
        let commission_service = Arc::new(CommissionService::new(store.clone(), rate_provider));
        let tracking = Arc::new(TrackingService::new(
            store.clone(),
            trip_service.clone(),
            ArrivalDetector::default(),
        ));

        Self {
            settings: SettingsRepository::new(store.clone()),
            store,
            trip_service,
            offer_service,
            commission_service,
            tracking,
        }
    }

    /// Fijar la tasa de comisión global
    pub async fn set_commission_rate(&self, percentage: u32) {
        self.settings
            .upsert_service_percentage(percentage)
            .await
            .expect("set commission rate");
    }

    /// Aprovisionar un perfil de conductor (el sistema de identidad externo
    /// crea estos documentos con el uid como id)
    pub async fn seed_driver(&self, driver_id: &str, vehicle_type: VehicleType) {
        self.store
            .batch_write(vec![WriteOp::Create {
                collection: "users".to_string(),
                id: driver_id.to_string(),
                data: json!({
                    "hasVehicle": true,
                    "vehicleType": vehicle_type,
                    "displayName": format!("Conductor {}", driver_id),
                    "email": format!("{}@test.local", driver_id),
                    "phone": "0414-0000000",
                }),
            }])
            .await
            .expect("seed driver");
    }

    /// Crear una solicitud de viaje con los defaults de test
    pub async fn request_trip(&self, user_id: &str, vehicle_type: VehicleType) -> TripDoc {
        self.trip_service
            .request_trip(NewTripRequest {
                user_id: user_id.to_string(),
                user_name: Some(format!("Pasajero {}", user_id)),
                user_email: Some(format!("{}@test.local", user_id)),
                user_photo: None,
                user_phone: Some("0424-0000000".to_string()),
                vehicle_type,
                pickup: PICKUP,
                pickup_address: Some("Alta Vista, Ciudad Guayana".to_string()),
                destination: Destination {
                    latitude: DROPOFF.latitude,
                    longitude: DROPOFF.longitude,
                    address: "Unare, Ciudad Guayana".to_string(),
                },
            })
            .await
            .expect("request trip")
    }

    /// Llevar un viaje recién creado hasta `accepted` con el conductor dado
    pub async fn accepted_trip(
        &self,
        user_id: &str,
        driver_id: &str,
        vehicle_type: VehicleType,
        price: rust_decimal::Decimal,
    ) -> TripDoc {
        let doc = self.request_trip(user_id, vehicle_type).await;
        self.offer_service
            .submit_offer(&doc.id, driver_id, price, Some(PICKUP))
            .await
            .expect("submit offer");
        self.offer_service
            .respond_to_offer(
                &doc.id,
                user_id,
                taxi_marketplace::services::OfferDecision::Accept,
            )
            .await
            .expect("accept offer")
    }

    /// Llevar un viaje hasta `completed` por la vía manual
    pub async fn completed_trip(
        &self,
        user_id: &str,
        driver_id: &str,
        vehicle_type: VehicleType,
        price: rust_decimal::Decimal,
    ) -> TripDoc {
        let doc = self
            .accepted_trip(user_id, driver_id, vehicle_type, price)
            .await;
        self.trip_service
            .driver_arrived(&doc.id, driver_id)
            .await
            .expect("driver arrived");
        self.trip_service
            .start_trip(&doc.id, driver_id)
            .await
            .expect("start trip");
        self.trip_service
            .complete_trip(&doc.id, driver_id)
            .await
            .expect("complete trip")
    }
}

/// Invariante: driverId presente si y solo si el estado pasó por `offered`
/// y no volvió al pool ni se canceló
pub fn assert_driver_id_invariant(doc: &TripDoc) {
    use taxi_marketplace::models::trip::TripStatus::*;

    let should_have_driver = matches!(
        doc.trip.status,
        Offered | Accepted | DriverArrived | InProgress | Completed
    );
    assert_eq!(
        doc.trip.driver_id.is_some(),
        should_have_driver,
        "driverId invariant broken for status {:?}",
        doc.trip.status
    );
}

/// Esperar hasta que una condición sobre el viaje se cumpla (el tracking
/// transiciona en un task aparte)
pub async fn wait_for_trip<F>(
    service: &TripService,
    trip_id: &str,
    mut condition: F,
) -> TripDoc
where
    F: FnMut(&TripDoc) -> bool,
{
    for _ in 0..100 {
        let doc = service.get_trip(trip_id).await.expect("get trip");
        if condition(&doc) {
            return doc;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached for trip {}", trip_id);
}
