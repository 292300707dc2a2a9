//! DTOs del protocolo de ofertas

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::trip::TripDoc;
use crate::models::VehicleType;

use super::trip_dto::GeoPointDto;

/// Query del pool de solicitudes pendientes
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolQuery {
    pub vehicle_type: VehicleType,
    /// Si viene, se excluye al conductor con negociación activa y se le
    /// devuelve su viaje en curso
    pub driver_id: Option<String>,
}

/// Respuesta del pool: o la lista de solicitudes, o el viaje activo al que
/// el conductor debe ser redirigido
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_trip: Option<TripDoc>,
    pub requests: Vec<TripDoc>,
}

/// Request de oferta de un conductor
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOfferRequest {
    #[validate(length(min = 1))]
    pub driver_id: String,
    pub price: Decimal,
    #[validate]
    pub driver_location: Option<GeoPointDto>,
}
