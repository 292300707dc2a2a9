//! Rutas de configuración administrativa

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};

use crate::controllers::SettingsController;
use crate::dto::common::ApiResponse;
use crate::dto::settings_dto::{CommissionSettingResponse, UpdateCommissionRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_settings_router() -> Router<AppState> {
    Router::new().route("/commission", get(get_commission).put(update_commission))
}

async fn get_commission(
    State(state): State<AppState>,
) -> Result<Json<CommissionSettingResponse>, AppError> {
    let controller = SettingsController::new(state.store.clone());
    Ok(Json(controller.get_commission().await?))
}

async fn update_commission(
    State(state): State<AppState>,
    Json(request): Json<UpdateCommissionRequest>,
) -> Result<Json<ApiResponse<CommissionSettingResponse>>, AppError> {
    let controller = SettingsController::new(state.store.clone());
    Ok(Json(controller.update_commission(request).await?))
}
