//! Servicio de viajes
//!
//! Dueño del campo `status` y de sus transiciones legales. Toda mutación es
//! un update condicional contra el estado persistido (read-modify-write con
//! guard re-evaluado al escribir), nunca una sobreescritura ciega; un guard
//! vencido se reporta como estado obsoleto y el caller debe releer.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Map};

use crate::metrics;
use crate::models::trip::{TripDoc, TripEvent, TripRequest, TripStatus};
use crate::models::{generate_trip_id, Destination, GeoPoint, VehicleType};
use crate::repositories::trip_repository::driver_purge_fields;
use crate::repositories::TripRepository;
use crate::services::commission_service::{commission_for, CommissionRateProvider};
use crate::services::geocoding_service::{GeocodingService, UNKNOWN_ADDRESS};
use crate::store::{DocumentStore, Predicate, StoreError};
use crate::utils::errors::AppError;
use crate::utils::validation::validate_coordinates;

/// Datos de entrada para crear una solicitud de viaje
#[derive(Debug, Clone)]
pub struct NewTripRequest {
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_photo: Option<String>,
    pub user_phone: Option<String>,
    pub vehicle_type: VehicleType,
    pub pickup: GeoPoint,
    /// Dirección legible; si falta se resuelve con el oráculo de geocoding
    pub pickup_address: Option<String>,
    pub destination: Destination,
}

/// Rol del usuario en una entrada del historial
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TripRole {
    Passenger,
    Driver,
}

/// Entrada del historial de viajes de un usuario
#[derive(Debug)]
pub struct HistoryEntry {
    pub doc: TripDoc,
    pub role: TripRole,
    /// Comisión del viaje, solo para viajes completados como conductor
    pub commission: Option<Decimal>,
    /// Ganancia neta (precio - comisión), ídem
    pub net_earnings: Option<Decimal>,
}

pub struct TripService {
    trips: TripRepository,
    rate_provider: Arc<dyn CommissionRateProvider>,
    geocoding: Arc<GeocodingService>,
}

impl TripService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        rate_provider: Arc<dyn CommissionRateProvider>,
        geocoding: Arc<GeocodingService>,
    ) -> Self {
        Self {
            trips: TripRepository::new(store),
            rate_provider,
            geocoding,
        }
    }

    pub fn repository(&self) -> &TripRepository {
        &self.trips
    }

    pub async fn get_trip(&self, trip_id: &str) -> Result<TripDoc, AppError> {
        self.trips
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| AppError::NotFound("El viaje no existe".to_string()))
    }

    /// Crear una solicitud de viaje (→ `pending`).
    ///
    /// Congela la tasa de comisión vigente en `servicePercentage`; los
    /// cambios posteriores de la tasa global no tocan este viaje.
    pub async fn request_trip(&self, request: NewTripRequest) -> Result<TripDoc, AppError> {
        validate_coordinates(request.pickup.latitude, request.pickup.longitude)
            .map_err(|_| AppError::BadRequest("Coordenadas de recogida inválidas".to_string()))?;
        validate_coordinates(
            request.destination.latitude,
            request.destination.longitude,
        )
        .map_err(|_| AppError::BadRequest("Coordenadas de destino inválidas".to_string()))?;

        // Un solo viaje vivo por pasajero
        let active = self.trips.find_active_by_user(&request.user_id).await?;
        if !active.is_empty() {
            return Err(AppError::StaleState(
                "Ya tienes un viaje activo; cancélalo o espera a que termine".to_string(),
            ));
        }

        // Dirección legible best-effort: el geocoding caído no bloquea la
        // creación del viaje
        let address = match request.pickup_address {
            Some(address) if !address.trim().is_empty() => address,
            _ => match self
                .geocoding
                .reverse_geocode(request.pickup.latitude, request.pickup.longitude)
                .await
            {
                Ok(result) => result.display_address,
                Err(e) => {
                    tracing::warn!("reverse geocode failed, using placeholder: {}", e);
                    UNKNOWN_ADDRESS.to_string()
                }
            },
        };

        let service_percentage = self.rate_provider.current_rate().await?;

        let trip = TripRequest {
            trip_id: generate_trip_id(),
            status: TripStatus::Pending,
            user_id: request.user_id,
            user_name: request.user_name,
            user_email: request.user_email,
            user_photo: request.user_photo,
            user_phone: request.user_phone,
            vehicle_type: Some(request.vehicle_type),
            location: request.pickup,
            address,
            destination: request.destination,
            driver_id: None,
            driver_name: None,
            driver_photo: None,
            driver_email: None,
            driver_phone: None,
            driver_location: None,
            driver_start_location: None,
            driver_arrived: None,
            price: None,
            service_percentage: Some(service_percentage),
            commission_status: None,
            created_at: Utc::now(),
            offered_at: None,
            accepted_at: None,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
        };

        let id = self.trips.create(&trip).await?;
        metrics::TRIPS_CREATED.inc();
        tracing::info!("trip {} created by user {} ({})", id, trip.user_id, trip.trip_id);

        Ok(TripDoc { id, trip })
    }

    /// Cancelación del pasajero. Válida desde `pending`, `offered` y
    /// `accepted`; al cancelar se limpian los campos del conductor.
    pub async fn cancel_trip(&self, trip_id: &str, user_id: &str) -> Result<TripDoc, AppError> {
        let doc = self.get_trip(trip_id).await?;
        if doc.trip.user_id != user_id {
            return Err(AppError::NotOwner("Este viaje no es tuyo".to_string()));
        }
        if doc.trip.status.next(TripEvent::TripCancelled).is_none() {
            return Err(AppError::StaleState(
                "El viaje ya no se puede cancelar".to_string(),
            ));
        }

        let mut fields = driver_purge_fields();
        fields.insert("status".to_string(), json!("cancelled"));
        fields.insert("cancelledAt".to_string(), json!(Utc::now()));

        let guard = [
            Predicate::eq("userId", user_id),
            Predicate::is_in(
                "status",
                vec![json!("pending"), json!("offered"), json!("accepted")],
            ),
        ];

        match self.trips.update(trip_id, fields, &guard).await {
            Ok(()) => {}
            Err(StoreError::GuardFailed { .. }) => {
                return Err(AppError::StaleState(
                    "El viaje ya no se puede cancelar".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        metrics::TRIPS_CANCELLED.inc();
        self.get_trip(trip_id).await
    }

    /// Llegada al punto de recogida (`accepted` → `driver_arrived`), sea por
    /// proximidad o por acción manual del conductor. Idempotente: volver a
    /// marcarla cuando ya está marcada no es un error.
    pub async fn driver_arrived(
        &self,
        trip_id: &str,
        driver_id: &str,
    ) -> Result<TripDoc, AppError> {
        let doc = self.get_trip(trip_id).await?;
        if doc.trip.driver_id.as_deref() != Some(driver_id) {
            return Err(AppError::NotOwner(
                "No eres el conductor de este viaje".to_string(),
            ));
        }
        if doc.trip.status == TripStatus::DriverArrived {
            return Ok(doc);
        }
        if doc.trip.status.next(TripEvent::ArrivedAtPickup).is_none() {
            return Err(AppError::StaleState(
                "El viaje no está esperando tu llegada".to_string(),
            ));
        }

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("driver_arrived"));
        fields.insert("driverArrived".to_string(), json!(true));
        fields.insert("arrivedAt".to_string(), json!(Utc::now()));

        let guard = [
            Predicate::eq("status", "accepted"),
            Predicate::eq("driverId", driver_id),
        ];

        match self.trips.update(trip_id, fields, &guard).await {
            Ok(()) => self.get_trip(trip_id).await,
            Err(StoreError::GuardFailed { .. }) => {
                // Carrera con el detector de proximidad: si otro actor ya
                // marcó la llegada, el resultado pedido ya existe
                let current = self.get_trip(trip_id).await?;
                if current.trip.status == TripStatus::DriverArrived {
                    Ok(current)
                } else {
                    Err(AppError::StaleState(
                        "El viaje no está esperando tu llegada".to_string(),
                    ))
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// El conductor inicia la navegación al destino
    /// (`driver_arrived` → `in_progress`)
    pub async fn start_trip(&self, trip_id: &str, driver_id: &str) -> Result<TripDoc, AppError> {
        let doc = self.get_trip(trip_id).await?;
        if doc.trip.driver_id.as_deref() != Some(driver_id) {
            return Err(AppError::NotOwner(
                "No eres el conductor de este viaje".to_string(),
            ));
        }
        if doc.trip.status.next(TripEvent::TripStarted).is_none() {
            return Err(AppError::StaleState(
                "Debes llegar al punto de recogida antes de iniciar".to_string(),
            ));
        }

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("in_progress"));

        let guard = [
            Predicate::eq("status", "driver_arrived"),
            Predicate::eq("driverId", driver_id),
        ];

        match self.trips.update(trip_id, fields, &guard).await {
            Ok(()) => self.get_trip(trip_id).await,
            Err(StoreError::GuardFailed { .. }) => Err(AppError::StaleState(
                "El viaje cambió de estado; recarga e intenta de nuevo".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Completar el viaje (`in_progress` → `completed`), por proximidad al
    /// destino o cierre manual. Deja la comisión como deuda sin pagar.
    pub async fn complete_trip(
        &self,
        trip_id: &str,
        driver_id: &str,
    ) -> Result<TripDoc, AppError> {
        let doc = self.get_trip(trip_id).await?;
        if doc.trip.driver_id.as_deref() != Some(driver_id) {
            return Err(AppError::NotOwner(
                "No eres el conductor de este viaje".to_string(),
            ));
        }
        if doc.trip.status.next(TripEvent::TripCompleted).is_none() {
            return Err(AppError::StaleState(
                "El viaje no está en curso".to_string(),
            ));
        }

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("completed"));
        fields.insert("completedAt".to_string(), json!(Utc::now()));
        fields.insert("commissionStatus".to_string(), json!(false));

        let guard = [
            Predicate::eq("status", "in_progress"),
            Predicate::eq("driverId", driver_id),
        ];

        match self.trips.update(trip_id, fields, &guard).await {
            Ok(()) => {}
            Err(StoreError::GuardFailed { .. }) => {
                return Err(AppError::StaleState(
                    "El viaje no está en curso".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        metrics::TRIPS_COMPLETED.inc();
        tracing::info!("trip {} completed by driver {}", trip_id, driver_id);
        self.get_trip(trip_id).await
    }

    /// Historial combinado de un usuario como pasajero y como conductor,
    /// más recientes primero. Para los viajes completados como conductor se
    /// anexa comisión y ganancia neta.
    pub async fn trip_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>, AppError> {
        let current_rate = self.rate_provider.current_rate().await?;

        let as_passenger = self.trips.find_by_user(user_id).await?;
        let as_driver = self.trips.find_by_driver(user_id).await?;

        let mut entries: Vec<HistoryEntry> = as_passenger
            .into_iter()
            .map(|doc| HistoryEntry {
                doc,
                role: TripRole::Passenger,
                commission: None,
                net_earnings: None,
            })
            .chain(as_driver.into_iter().map(|doc| {
                let earnings = match (doc.trip.status, doc.trip.price) {
                    (TripStatus::Completed, Some(price)) => {
                        let fee = commission_for(&doc.trip, current_rate);
                        Some((fee, price - fee))
                    }
                    _ => None,
                };
                HistoryEntry {
                    doc,
                    role: TripRole::Driver,
                    commission: earnings.map(|(fee, _)| fee),
                    net_earnings: earnings.map(|(_, net)| net),
                }
            }))
            .collect();

        entries.sort_by(|a, b| b.doc.trip.created_at.cmp(&a.doc.trip.created_at));
        Ok(entries)
    }

    /// Barrido de solicitudes pendientes viejas: toda `pending` con más de
    /// `max_age` se cancela. Idempotente y seguro de correr en paralelo: el
    /// guard sobre `pending` hace que un segundo barrido simplemente no
    /// encuentre nada que cambiar.
    pub async fn sweep_stale_pending(&self, max_age: Duration) -> Result<usize, AppError> {
        let cutoff = Utc::now() - max_age;
        let pending = self.trips.find_pending().await?;

        let mut swept = 0usize;
        for doc in pending {
            if doc.trip.created_at >= cutoff {
                continue;
            }

            let mut fields = Map::new();
            fields.insert("status".to_string(), json!("cancelled"));
            fields.insert("cancelledAt".to_string(), json!(Utc::now()));

            match self
                .trips
                .update(&doc.id, fields, &[Predicate::eq("status", "pending")])
                .await
            {
                Ok(()) => {
                    tracing::info!(
                        "Solicitud {} cancelada automáticamente por inactividad",
                        doc.id
                    );
                    swept += 1;
                }
                // Alguien la ofertó o canceló en el medio: no es nuestra
                Err(StoreError::GuardFailed { .. }) | Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if swept > 0 {
            metrics::TRIPS_SWEPT.inc_by(swept as u64);
        }
        Ok(swept)
    }
}
