//! Controller de configuración
//!
//! Lectura y ajuste de la tasa de comisión global. Los cambios solo afectan
//! viajes nuevos; los ya creados conservan su snapshot.

use std::sync::Arc;

use crate::dto::common::ApiResponse;
use crate::dto::settings_dto::{CommissionSettingResponse, UpdateCommissionRequest};
use crate::models::settings::DEFAULT_SERVICE_PERCENTAGE;
use crate::repositories::SettingsRepository;
use crate::store::DocumentStore;
use crate::utils::errors::AppError;
use crate::utils::validation::validate_service_percentage;

pub struct SettingsController {
    settings: SettingsRepository,
}

impl SettingsController {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            settings: SettingsRepository::new(store),
        }
    }

    pub async fn get_commission(&self) -> Result<CommissionSettingResponse, AppError> {
        let setting = self.settings.get().await?;
        Ok(setting
            .map(Into::into)
            .unwrap_or(CommissionSettingResponse {
                service_percentage: DEFAULT_SERVICE_PERCENTAGE,
                updated_at: None,
            }))
    }

    pub async fn update_commission(
        &self,
        request: UpdateCommissionRequest,
    ) -> Result<ApiResponse<CommissionSettingResponse>, AppError> {
        validate_service_percentage(request.service_percentage).map_err(|_| {
            AppError::BadRequest(
                "El porcentaje debe ser un número entre 1 y 90.".to_string(),
            )
        })?;

        self.settings
            .upsert_service_percentage(request.service_percentage)
            .await?;

        let setting = self.get_commission().await?;
        Ok(ApiResponse::success_with_message(
            setting,
            "Porcentaje actualizado correctamente.".to_string(),
        ))
    }
}
