//! Servicio de ofertas
//!
//! Expone el pool de solicitudes pendientes a los conductores elegibles y
//! media la negociación oferta/aceptación/rechazo de a una oferta por vez.
//! Si dos conductores ofertan casi a la vez, exactamente uno gana: el guard
//! sobre `pending` rechaza al segundo con un error distinguible.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Map};

use crate::metrics;
use crate::models::trip::{TripDoc, TripStatus};
use crate::models::{GeoPoint, VehicleType};
use crate::repositories::trip_repository::driver_purge_fields;
use crate::repositories::{TripRepository, UserRepository};
use crate::services::notification_service::NotificationService;
use crate::store::{DocumentStore, Predicate, StoreError};
use crate::utils::errors::AppError;
use crate::utils::validation::is_valid_price;

/// Vista del pool para un conductor
#[derive(Debug)]
pub enum PoolView {
    /// Solicitudes pendientes que puede ofertar, más antiguas primero
    Pool(Vec<TripDoc>),
    /// El conductor ya tiene una negociación o carrera activa y debe
    /// resolverla antes de ver el pool
    ActiveTrip(TripDoc),
}

/// Decisión del pasajero sobre una oferta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferDecision {
    Accept,
    Decline,
}

pub struct OfferService {
    trips: TripRepository,
    users: UserRepository,
    notifications: Arc<NotificationService>,
}

impl OfferService {
    pub fn new(store: Arc<dyn DocumentStore>, notifications: Arc<NotificationService>) -> Self {
        Self {
            trips: TripRepository::new(store.clone()),
            users: UserRepository::new(store),
            notifications,
        }
    }

    /// Pool de solicitudes pendientes del tipo de vehículo del conductor.
    ///
    /// Un conductor con oferta en pie o carrera en curso no ve el pool: se le
    /// devuelve su viaje activo para redirigirlo.
    pub async fn list_pending_trips(
        &self,
        vehicle_type: VehicleType,
        driver_id: Option<&str>,
    ) -> Result<PoolView, AppError> {
        if let Some(driver_id) = driver_id {
            let mut active = self.trips.find_active_by_driver(driver_id).await?;
            if let Some(doc) = active.pop() {
                return Ok(PoolView::ActiveTrip(doc));
            }
        }

        let mut pool = self.trips.find_pending_by_vehicle(vehicle_type).await?;
        pool.sort_by(|a, b| a.trip.created_at.cmp(&b.trip.created_at));
        Ok(PoolView::Pool(pool))
    }

    /// Un conductor propone un precio por una solicitud pendiente
    /// (`pending` → `offered`).
    pub async fn submit_offer(
        &self,
        trip_id: &str,
        driver_id: &str,
        price: Decimal,
        driver_location: Option<GeoPoint>,
    ) -> Result<TripDoc, AppError> {
        if !is_valid_price(price) {
            return Err(AppError::InvalidPrice(
                "Por favor, ingresa un precio válido".to_string(),
            ));
        }

        // Una negociación por conductor a la vez
        let active = self.trips.find_active_by_driver(driver_id).await?;
        if !active.is_empty() {
            return Err(AppError::StaleState(
                "Ya tienes una oferta o carrera activa; resuélvela antes de ofertar".to_string(),
            ));
        }

        let doc = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("El viaje no existe".to_string()))?;
        if doc.trip.status != TripStatus::Pending {
            return Err(AppError::AlreadyOffered(
                "Otro conductor ya tomó esta solicitud".to_string(),
            ));
        }

        // Snapshot del perfil del conductor en el documento del viaje
        let profile = self.users.find_by_id(driver_id).await?;

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("offered"));
        fields.insert("driverId".to_string(), json!(driver_id));
        fields.insert("price".to_string(), json!(price));
        fields.insert("offeredAt".to_string(), json!(Utc::now()));
        if let Some(profile) = &profile {
            fields.insert("driverName".to_string(), json!(profile.display_name));
            fields.insert("driverPhoto".to_string(), json!(profile.photo_url));
            fields.insert("driverEmail".to_string(), json!(profile.email));
            fields.insert("driverPhone".to_string(), json!(profile.phone));
        }
        if let Some(location) = driver_location {
            fields.insert("driverStartLocation".to_string(), json!(location));
        }

        match self
            .trips
            .update(trip_id, fields, &[Predicate::eq("status", "pending")])
            .await
        {
            Ok(()) => {}
            Err(StoreError::GuardFailed { .. }) => {
                // El otro escritor ganó la carrera por esta solicitud
                return Err(AppError::AlreadyOffered(
                    "Otro conductor ya tomó esta solicitud".to_string(),
                ));
            }
            Err(StoreError::NotFound { .. }) => {
                return Err(AppError::NotFound("El viaje no existe".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        metrics::OFFERS_SUBMITTED.inc();
        tracing::info!(
            "driver {} offered {} on trip {}",
            driver_id,
            price,
            trip_id
        );

        // Fan-out best-effort a los demás conductores elegibles: la solicitud
        // salió del pool. Una falla aquí no revierte la oferta.
        if let Some(vehicle_type) = doc.trip.vehicle_type {
            self.notify_pool_change(trip_id, driver_id, vehicle_type).await;
        }

        self.trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("El viaje no existe".to_string()))
    }

    async fn notify_pool_change(
        &self,
        trip_id: &str,
        offering_driver: &str,
        vehicle_type: VehicleType,
    ) {
        let drivers = match self.users.find_drivers_by_vehicle(vehicle_type).await {
            Ok(drivers) => drivers,
            Err(e) => {
                tracing::warn!("offer fan-out query failed: {}", e);
                return;
            }
        };

        for (user_id, _) in drivers {
            if user_id == offering_driver {
                continue;
            }
            self.notifications
                .notify(
                    &user_id,
                    "Solicitud tomada",
                    "Una solicitud del pool acaba de recibir una oferta",
                    Some(json!({ "tripId": trip_id })),
                )
                .await;
        }
    }

    /// El pasajero acepta o rechaza la oferta en pie.
    ///
    /// Aceptar pasa a `accepted`; rechazar devuelve el viaje a `pending` y
    /// purga todos los campos del conductor para que vuelva al pool.
    pub async fn respond_to_offer(
        &self,
        trip_id: &str,
        passenger_id: &str,
        decision: OfferDecision,
    ) -> Result<TripDoc, AppError> {
        let doc = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("El viaje no existe".to_string()))?;

        if doc.trip.user_id != passenger_id {
            return Err(AppError::NotOwner("Este viaje no es tuyo".to_string()));
        }
        if doc.trip.status != TripStatus::Offered {
            return Err(AppError::NotOffered(
                "Esta oferta ya no es válida".to_string(),
            ));
        }

        let fields = match decision {
            OfferDecision::Accept => {
                let mut fields = Map::new();
                fields.insert("status".to_string(), json!("accepted"));
                fields.insert("acceptedAt".to_string(), json!(Utc::now()));
                fields
            }
            OfferDecision::Decline => {
                let mut fields = driver_purge_fields();
                fields.insert("status".to_string(), json!("pending"));
                fields
            }
        };

        let guard = [
            Predicate::eq("status", "offered"),
            Predicate::eq("userId", passenger_id),
        ];

        match self.trips.update(trip_id, fields, &guard).await {
            Ok(()) => {}
            Err(StoreError::GuardFailed { .. }) => {
                return Err(AppError::NotOffered(
                    "Esta oferta ya no es válida".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        match decision {
            OfferDecision::Accept => metrics::OFFERS_ACCEPTED.inc(),
            OfferDecision::Decline => metrics::OFFERS_DECLINED.inc(),
        }

        // Avisar al conductor el desenlace de su oferta
        if let Some(driver_id) = &doc.trip.driver_id {
            let (title, body) = match decision {
                OfferDecision::Accept => (
                    "¡Oferta aceptada!",
                    "El pasajero aceptó tu precio. Dirígete al punto de recogida.",
                ),
                OfferDecision::Decline => (
                    "Oferta rechazada",
                    "El pasajero rechazó tu oferta. La solicitud volvió al pool.",
                ),
            };
            self.notifications
                .notify(driver_id, title, body, Some(json!({ "tripId": trip_id })))
                .await;
        }

        self.trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("El viaje no existe".to_string()))
    }

    /// El conductor asignado libera el viaje: retira su oferta o abandona una
    /// carrera aceptada. El viaje vuelve a `pending` sin rastro del
    /// conductor.
    pub async fn release_trip(
        &self,
        trip_id: &str,
        driver_id: &str,
    ) -> Result<TripDoc, AppError> {
        let doc = self
            .trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("El viaje no existe".to_string()))?;

        if doc.trip.driver_id.as_deref() != Some(driver_id) {
            return Err(AppError::NotOwner(
                "No eres el conductor de este viaje".to_string(),
            ));
        }
        if !matches!(
            doc.trip.status,
            TripStatus::Offered | TripStatus::Accepted
        ) {
            return Err(AppError::StaleState(
                "El viaje ya no se puede liberar".to_string(),
            ));
        }

        let mut fields = driver_purge_fields();
        fields.insert("status".to_string(), json!("pending"));

        let guard = [
            Predicate::is_in("status", vec![json!("offered"), json!("accepted")]),
            Predicate::eq("driverId", driver_id),
        ];

        match self.trips.update(trip_id, fields, &guard).await {
            Ok(()) => {}
            Err(StoreError::GuardFailed { .. }) => {
                return Err(AppError::StaleState(
                    "El viaje ya no se puede liberar".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!("driver {} released trip {}", driver_id, trip_id);

        // El pasajero vuelve a esperar conductor
        self.notifications
            .notify(
                &doc.trip.user_id,
                "Buscando otro conductor",
                "Tu conductor liberó el viaje; la solicitud volvió al pool.",
                Some(json!({ "tripId": trip_id })),
            )
            .await;

        self.trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("El viaje no existe".to_string()))
    }
}
