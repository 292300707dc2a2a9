//! Servicio de tracking y detección de llegada
//!
//! Consume el stream de posiciones del conductor una vez aceptada la carrera,
//! persiste la posición en el documento compartido y dispara las transiciones
//! de llegada. El stream es push-based sin cadencia garantizada; al salir el
//! viaje del estado monitoreado el tracking se corta y las muestras en vuelo
//! se descartan.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map};
use tokio::sync::{mpsc, RwLock};

use crate::metrics;
use crate::models::trip::TripStatus;
use crate::models::GeoPoint;
use crate::repositories::TripRepository;
use crate::services::trip_service::TripService;
use crate::store::{DocumentStore, Predicate, StoreError};
use crate::utils::errors::AppError;

/// Umbral histórico de llegada: distancia al cuadrado en grados².
/// Aproxima 50-100 metros según latitud; no es geodésico.
pub const ARRIVAL_THRESHOLD_DEGREES_SQ: f64 = 1e-6;

/// Radio de llegada por defecto para la variante haversine, en metros
pub const DEFAULT_ARRIVAL_RADIUS_METERS: f64 = 75.0;

/// Tramo del viaje que se está siguiendo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingLeg {
    /// Hacia el punto de recogida (viaje `accepted`)
    ToPickup,
    /// Hacia el destino (viaje `in_progress`)
    ToDestination,
}

/// Detector de proximidad configurable.
///
/// `SquaredDegrees` reproduce el comportamiento histórico (umbral 1e-6 en
/// grados², dependiente de latitud). `Haversine` es la variante corregida en
/// metros, opt-in por configuración; es una desviación documentada del
/// comportamiento original.
#[derive(Debug, Clone, Copy)]
pub enum ArrivalDetector {
    SquaredDegrees { threshold: f64 },
    Haversine { radius_meters: f64 },
}

impl Default for ArrivalDetector {
    fn default() -> Self {
        ArrivalDetector::SquaredDegrees {
            threshold: ARRIVAL_THRESHOLD_DEGREES_SQ,
        }
    }
}

impl ArrivalDetector {
    pub fn is_arrival(&self, current: &GeoPoint, target: &GeoPoint) -> bool {
        match self {
            ArrivalDetector::SquaredDegrees { threshold } => {
                current.squared_degree_distance(target) < *threshold
            }
            ArrivalDetector::Haversine { radius_meters } => {
                current.haversine_meters(target) < *radius_meters
            }
        }
    }
}

pub struct TrackingService {
    trips: TripRepository,
    trip_service: Arc<TripService>,
    detector: ArrivalDetector,
    sessions: Arc<RwLock<HashMap<String, mpsc::Sender<GeoPoint>>>>,
}

impl TrackingService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        trip_service: Arc<TripService>,
        detector: ArrivalDetector,
    ) -> Self {
        Self {
            trips: TripRepository::new(store),
            trip_service,
            detector,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Abrir la sesión de tracking de un tramo.
    ///
    /// Valida conductor y estado, y deja un consumidor esperando muestras.
    /// Reabrir sobre el mismo viaje reemplaza la sesión anterior.
    pub async fn start_tracking(
        &self,
        trip_id: &str,
        driver_id: &str,
        leg: TrackingLeg,
    ) -> Result<(), AppError> {
        let doc = self.trip_service.get_trip(trip_id).await?;

        if doc.trip.driver_id.as_deref() != Some(driver_id) {
            return Err(AppError::NotOwner(
                "No eres el conductor de este viaje".to_string(),
            ));
        }

        let (expected_status, target) = match leg {
            TrackingLeg::ToPickup => (TripStatus::Accepted, doc.trip.location),
            TrackingLeg::ToDestination => {
                (TripStatus::InProgress, doc.trip.destination.point())
            }
        };
        if doc.trip.status != expected_status {
            return Err(AppError::StaleState(
                "El viaje no está en un estado rastreable para ese tramo".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(32);
        // Reemplazar la sesión anterior: su sender se suelta y el task viejo
        // termina al quedarse sin productor
        self.sessions
            .write()
            .await
            .insert(trip_id.to_string(), tx);

        let worker = TrackingWorker {
            trips: self.trips.clone(),
            trip_service: self.trip_service.clone(),
            sessions: self.sessions.clone(),
            detector: self.detector,
            trip_id: trip_id.to_string(),
            driver_id: driver_id.to_string(),
            leg,
            target,
        };
        tokio::spawn(worker.run(rx));

        tracing::info!(
            "tracking started for trip {} ({:?}) by driver {}",
            trip_id,
            leg,
            driver_id
        );
        Ok(())
    }

    /// Entregar una muestra de posición a la sesión del viaje
    pub async fn push_sample(&self, trip_id: &str, point: GeoPoint) -> Result<(), AppError> {
        let sender = self.sessions.read().await.get(trip_id).cloned();
        match sender {
            Some(tx) => tx.send(point).await.map_err(|_| {
                AppError::StaleState(
                    "El tracking de este tramo ya terminó".to_string(),
                )
            }),
            None => Err(AppError::NotFound(
                "No hay tracking activo para este viaje".to_string(),
            )),
        }
    }

    /// Teardown explícito de la sesión (el cliente salió de la pantalla)
    pub async fn stop_tracking(&self, trip_id: &str) {
        if self.sessions.write().await.remove(trip_id).is_some() {
            tracing::info!("tracking stopped for trip {}", trip_id);
        }
    }

    /// Cantidad de sesiones vivas
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}

struct TrackingWorker {
    trips: TripRepository,
    trip_service: Arc<TripService>,
    sessions: Arc<RwLock<HashMap<String, mpsc::Sender<GeoPoint>>>>,
    detector: ArrivalDetector,
    trip_id: String,
    driver_id: String,
    leg: TrackingLeg,
    target: GeoPoint,
}

impl TrackingWorker {
    async fn run(self, mut rx: mpsc::Receiver<GeoPoint>) {
        let monitored_status = match self.leg {
            TrackingLeg::ToPickup => "accepted",
            TrackingLeg::ToDestination => "in_progress",
        };

        while let Some(point) = rx.recv().await {
            // Persistir la posición solo mientras el viaje siga en el estado
            // monitoreado; si salió (cancelado, completado, liberado) el
            // tracking de este tramo muere acá
            let mut fields = Map::new();
            fields.insert("driverLocation".to_string(), json!(point));

            let guard = [
                Predicate::eq("status", monitored_status),
                Predicate::eq("driverId", self.driver_id.as_str()),
            ];

            match self.trips.update(&self.trip_id, fields, &guard).await {
                Ok(()) => {}
                Err(StoreError::GuardFailed { .. }) | Err(StoreError::NotFound { .. }) => {
                    tracing::info!(
                        "trip {} left tracked status, ending {:?} tracking",
                        self.trip_id,
                        self.leg
                    );
                    break;
                }
                Err(e) => {
                    // Falla de transporte: se pierde la muestra, no la sesión
                    tracing::warn!("driverLocation update failed: {}", e);
                    continue;
                }
            }

            if self.detector.is_arrival(&point, &self.target) {
                let transition = match self.leg {
                    TrackingLeg::ToPickup => {
                        self.trip_service
                            .driver_arrived(&self.trip_id, &self.driver_id)
                            .await
                    }
                    TrackingLeg::ToDestination => {
                        self.trip_service
                            .complete_trip(&self.trip_id, &self.driver_id)
                            .await
                    }
                };

                match transition {
                    Ok(_) => {
                        metrics::ARRIVALS_DETECTED.inc();
                        tracing::info!(
                            "arrival detected on trip {} ({:?})",
                            self.trip_id,
                            self.leg
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            "arrival transition on trip {} rejected: {}",
                            self.trip_id,
                            e
                        );
                    }
                }
                // La transición se dispara una sola vez por tramo: muestras
                // posteriores en el mismo punto ya no encuentran la sesión
                break;
            }
        }

        // Limpiar la entrada solo si sigue siendo la nuestra: si otra sesión
        // nos reemplazó, su sender está vivo y no hay que tocarla. Soltar el
        // receiver primero para que nuestro sender figure como cerrado.
        drop(rx);
        let mut sessions = self.sessions.write().await;
        if let Some(tx) = sessions.get(&self.trip_id) {
            if tx.is_closed() {
                sessions.remove(&self.trip_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squared_degrees_threshold_matches_legacy_behavior() {
        let detector = ArrivalDetector::default();
        let target = GeoPoint::new(8.2954, -62.7114);

        // Exactamente en el punto: distancia² = 0 < 1e-6
        assert!(detector.is_arrival(&target, &target));

        // ~55 m al norte (0.0005 grados): 2.5e-7 < 1e-6
        let near = GeoPoint::new(8.2959, -62.7114);
        assert!(detector.is_arrival(&near, &target));

        // ~220 m (0.002 grados): 4e-6 >= 1e-6
        let far = GeoPoint::new(8.2974, -62.7114);
        assert!(!detector.is_arrival(&far, &target));
    }

    #[test]
    fn haversine_variant_uses_meters() {
        let detector = ArrivalDetector::Haversine {
            radius_meters: DEFAULT_ARRIVAL_RADIUS_METERS,
        };
        let target = GeoPoint::new(8.2954, -62.7114);

        let near = GeoPoint::new(8.2958, -62.7114); // ~44 m
        assert!(detector.is_arrival(&near, &target));

        let far = GeoPoint::new(8.2974, -62.7114); // ~220 m
        assert!(!detector.is_arrival(&far, &target));
    }
}
