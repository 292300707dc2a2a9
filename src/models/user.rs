//! Modelo de perfil de usuario
//!
//! Los perfiles los aprovisiona el sistema de identidad externo; este core
//! solo los lee: el flag `hasVehicle` y el tipo de vehículo registrado
//! gobiernan el fan-out de notificaciones y el acceso a facturación.

use serde::{Deserialize, Serialize};

use super::trip::VehicleType;

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub has_vehicle: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}
