//! Repositorio de usuarios
//!
//! Solo lectura: los perfiles los crea el sistema de identidad externo con
//! el uid como id de documento.

use std::sync::Arc;

use serde_json::json;

use crate::models::user::{UserProfile, USERS_COLLECTION};
use crate::models::VehicleType;
use crate::store::{DocumentStore, Predicate, StoreError};

pub struct UserRepository {
    store: Arc<dyn DocumentStore>,
}

impl UserRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        match self.store.get(USERS_COLLECTION, user_id).await? {
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
            None => Ok(None),
        }
    }

    /// Conductores registrados con un tipo de vehículo dado, para el fan-out
    /// de notificaciones de ofertas
    pub async fn find_drivers_by_vehicle(
        &self,
        vehicle_type: VehicleType,
    ) -> Result<Vec<(String, UserProfile)>, StoreError> {
        let docs = self
            .store
            .query(
                USERS_COLLECTION,
                &[
                    Predicate::eq("hasVehicle", json!(true)),
                    Predicate::eq("vehicleType", serde_json::to_value(vehicle_type)?),
                ],
            )
            .await?;

        docs.into_iter()
            .map(|doc| {
                let profile: UserProfile = serde_json::from_value(doc.data)?;
                Ok((doc.id, profile))
            })
            .collect()
    }
}
