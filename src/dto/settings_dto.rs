//! DTOs de configuración

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::CommissionRateSetting;

/// Request para actualizar la tasa de comisión global.
/// El rango 1-90 se valida en el controller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommissionRequest {
    pub service_percentage: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSettingResponse {
    pub service_percentage: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<CommissionRateSetting> for CommissionSettingResponse {
    fn from(setting: CommissionRateSetting) -> Self {
        Self {
            service_percentage: setting.service_percentage,
            updated_at: setting.updated_at,
        }
    }
}
