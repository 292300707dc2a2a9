//! Repositorio de viajes
//!
//! Acceso tipado a la colección `taxiRequests`. Los guards de estado se
//! expresan como predicados del store y se evalúan en el momento de la
//! escritura; la traducción a errores de negocio la hacen los services.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::models::trip::{TripDoc, TripRequest, TripStatus, TRIPS_COLLECTION};
use crate::models::VehicleType;
use crate::store::{Document, DocumentStore, Predicate, StoreError, Subscription};

/// Campos del conductor que se eliminan cuando un viaje vuelve al pool o se
/// cancela: rechazo del pasajero, liberación del conductor o cancelación.
/// `null` borra el campo del documento.
pub fn driver_purge_fields() -> Map<String, Value> {
    let mut fields = Map::new();
    for key in [
        "driverId",
        "driverName",
        "driverPhoto",
        "driverEmail",
        "driverPhone",
        "driverLocation",
        "driverStartLocation",
        "driverArrived",
        "price",
        "offeredAt",
        "acceptedAt",
    ] {
        fields.insert(key.to_string(), Value::Null);
    }
    fields
}

#[derive(Clone)]
pub struct TripRepository {
    store: Arc<dyn DocumentStore>,
}

impl TripRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn decode(doc: Document) -> Result<TripDoc, StoreError> {
        let trip: TripRequest = serde_json::from_value(doc.data)?;
        Ok(TripDoc { id: doc.id, trip })
    }

    fn decode_all(docs: Vec<Document>) -> Result<Vec<TripDoc>, StoreError> {
        docs.into_iter().map(Self::decode).collect()
    }

    /// Predicado de estados "vivos" del pasajero
    fn active_status_predicate() -> Predicate {
        Predicate::is_in(
            "status",
            TripStatus::ACTIVE
                .iter()
                .map(|s| json!(s.as_str()))
                .collect(),
        )
    }

    pub async fn create(&self, trip: &TripRequest) -> Result<String, StoreError> {
        let data = serde_json::to_value(trip)?;
        self.store.create(TRIPS_COLLECTION, data).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<TripDoc>, StoreError> {
        match self.store.get(TRIPS_COLLECTION, id).await? {
            Some(data) => Ok(Some(Self::decode(Document {
                id: id.to_string(),
                data,
            })?)),
            None => Ok(None),
        }
    }

    /// Update condicional contra el estado persistido
    pub async fn update(
        &self,
        id: &str,
        fields: Map<String, Value>,
        guard: &[Predicate],
    ) -> Result<(), StoreError> {
        self.store.update(TRIPS_COLLECTION, id, fields, guard).await
    }

    /// Viajes vivos de un pasajero (a lo sumo uno si el invariante se cumple)
    pub async fn find_active_by_user(&self, user_id: &str) -> Result<Vec<TripDoc>, StoreError> {
        let docs = self
            .store
            .query(
                TRIPS_COLLECTION,
                &[
                    Predicate::eq("userId", user_id),
                    Self::active_status_predicate(),
                ],
            )
            .await?;
        Self::decode_all(docs)
    }

    /// Viaje activo del conductor: oferta en pie o carrera en curso
    pub async fn find_active_by_driver(
        &self,
        driver_id: &str,
    ) -> Result<Vec<TripDoc>, StoreError> {
        let docs = self
            .store
            .query(
                TRIPS_COLLECTION,
                &[
                    Predicate::eq("driverId", driver_id),
                    Predicate::is_in(
                        "status",
                        vec![
                            json!("offered"),
                            json!("accepted"),
                            json!("driver_arrived"),
                            json!("in_progress"),
                        ],
                    ),
                ],
            )
            .await?;
        Self::decode_all(docs)
    }

    /// Pool de solicitudes pendientes para un tipo de vehículo.
    ///
    /// Filtrado estricto: los viajes sin `vehicleType` no entran a ningún
    /// pool.
    pub async fn find_pending_by_vehicle(
        &self,
        vehicle_type: VehicleType,
    ) -> Result<Vec<TripDoc>, StoreError> {
        let docs = self
            .store
            .query(
                TRIPS_COLLECTION,
                &[
                    Predicate::eq("status", "pending"),
                    Predicate::eq("vehicleType", serde_json::to_value(vehicle_type)?),
                ],
            )
            .await?;
        Self::decode_all(docs)
    }

    /// Todas las solicitudes pendientes, para el sweep de antigüedad
    pub async fn find_pending(&self) -> Result<Vec<TripDoc>, StoreError> {
        let docs = self
            .store
            .query(TRIPS_COLLECTION, &[Predicate::eq("status", "pending")])
            .await?;
        Self::decode_all(docs)
    }

    /// Historial como pasajero
    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<TripDoc>, StoreError> {
        let docs = self
            .store
            .query(TRIPS_COLLECTION, &[Predicate::eq("userId", user_id)])
            .await?;
        Self::decode_all(docs)
    }

    /// Historial como conductor
    pub async fn find_by_driver(&self, driver_id: &str) -> Result<Vec<TripDoc>, StoreError> {
        let docs = self
            .store
            .query(TRIPS_COLLECTION, &[Predicate::eq("driverId", driver_id)])
            .await?;
        Self::decode_all(docs)
    }

    /// Viajes completados de un conductor; el llamador decide qué estados de
    /// comisión le interesan
    pub async fn find_completed_by_driver(
        &self,
        driver_id: &str,
    ) -> Result<Vec<TripDoc>, StoreError> {
        let docs = self
            .store
            .query(
                TRIPS_COLLECTION,
                &[
                    Predicate::eq("driverId", driver_id),
                    Predicate::eq("status", "completed"),
                ],
            )
            .await?;
        Self::decode_all(docs)
    }

    /// Suscripción a cambios de la colección completa; el llamador filtra por
    /// id de documento sobre los eventos
    pub async fn subscribe_all(&self) -> Result<Subscription, StoreError> {
        self.store.subscribe(TRIPS_COLLECTION, Vec::new()).await
    }

    /// Suscripción al pool pendiente de un tipo de vehículo
    pub async fn subscribe_pending_by_vehicle(
        &self,
        vehicle_type: VehicleType,
    ) -> Result<Subscription, StoreError> {
        self.store
            .subscribe(
                TRIPS_COLLECTION,
                vec![
                    Predicate::eq("status", "pending"),
                    Predicate::eq("vehicleType", serde_json::to_value(vehicle_type)?),
                ],
            )
            .await
    }
}
