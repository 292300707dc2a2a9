//! DTOs de viajes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::trip::TripRequest;
use crate::models::{Destination, GeoPoint, VehicleType};
use crate::services::trip_service::{HistoryEntry, TripRole};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GeoPointDto {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl From<GeoPointDto> for GeoPoint {
    fn from(dto: GeoPointDto) -> Self {
        GeoPoint::new(dto.latitude, dto.longitude)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DestinationDto {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[validate(length(min = 1, max = 500))]
    pub address: String,
}

impl From<DestinationDto> for Destination {
    fn from(dto: DestinationDto) -> Self {
        Destination {
            latitude: dto.latitude,
            longitude: dto.longitude,
            address: dto.address,
        }
    }
}

/// Request para crear una solicitud de viaje
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub user_photo: Option<String>,
    pub user_phone: Option<String>,
    pub vehicle_type: VehicleType,
    #[validate]
    pub pickup: GeoPointDto,
    pub pickup_address: Option<String>,
    #[validate]
    pub destination: DestinationDto,
}

/// Acción de un pasajero sobre su viaje (cancelar, aceptar, rechazar)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PassengerActionRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
}

/// Acción del conductor asignado (llegada, inicio, completar, liberar)
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DriverActionRequest {
    #[validate(length(min = 1))]
    pub driver_id: String,
}

/// Tramo a trackear
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingLegDto {
    Pickup,
    Destination,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StartTrackingRequest {
    #[validate(length(min = 1))]
    pub driver_id: String,
    pub leg: TrackingLegDto,
}

/// Muestra de posición del stream del conductor
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LocationSampleRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub user_id: String,
}

/// Entrada del historial con rol y ganancias del conductor
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntryResponse {
    pub id: String,
    pub role: TripRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_earnings: Option<Decimal>,
    #[serde(flatten)]
    pub trip: TripRequest,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            id: entry.doc.id,
            role: entry.role,
            commission: entry.commission,
            net_earnings: entry.net_earnings,
            trip: entry.doc.trip,
        }
    }
}
