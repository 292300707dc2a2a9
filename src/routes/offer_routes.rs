//! Rutas del pool de ofertas

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::OfferController;
use crate::dto::offer_dto::{PoolQuery, PoolResponse};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_offer_router() -> Router<AppState> {
    Router::new().route("/pool", get(pending_pool))
}

/// Pool de solicitudes pendientes visibles para un conductor
async fn pending_pool(
    State(state): State<AppState>,
    Query(query): Query<PoolQuery>,
) -> Result<Json<PoolResponse>, AppError> {
    let controller = OfferController::new(state.offer_service.clone());
    Ok(Json(controller.pool(query).await?))
}
