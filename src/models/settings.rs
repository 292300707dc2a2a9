//! Modelo de configuración global
//!
//! Un solo documento (`settings/general`) con la tasa de comisión vigente.
//! Cambiarla no afecta viajes que ya llevan su snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SETTINGS_COLLECTION: &str = "settings";
pub const GENERAL_SETTINGS_ID: &str = "general";

/// Porcentaje de comisión aplicado por defecto cuando no hay tasa configurada
pub const DEFAULT_SERVICE_PERCENTAGE: u32 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRateSetting {
    /// Porcentaje entero, rango administrado 1-90
    pub service_percentage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}
