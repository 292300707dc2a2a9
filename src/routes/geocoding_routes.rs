//! Rutas del oráculo de geocoding y rutas

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::GeocodingController;
use crate::dto::geocoding_dto::{ReverseGeocodeQuery, RouteQuery, SearchAddressQuery};
use crate::services::geocoding_service::{AddressHit, ReverseGeocodeResult};
use crate::services::routing_service::RoutePolyline;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_geocoding_router() -> Router<AppState> {
    Router::new()
        .route("/reverse", get(reverse_geocode))
        .route("/search", get(search_address))
        .route("/route", get(compute_route))
}

async fn reverse_geocode(
    State(state): State<AppState>,
    Query(query): Query<ReverseGeocodeQuery>,
) -> Result<Json<ReverseGeocodeResult>, AppError> {
    let controller = GeocodingController::new(state.geocoding.clone(), state.routing.clone());
    Ok(Json(controller.reverse(query).await?))
}

async fn search_address(
    State(state): State<AppState>,
    Query(query): Query<SearchAddressQuery>,
) -> Result<Json<Vec<AddressHit>>, AppError> {
    let controller = GeocodingController::new(state.geocoding.clone(), state.routing.clone());
    Ok(Json(controller.search(query).await?))
}

async fn compute_route(
    State(state): State<AppState>,
    Query(query): Query<RouteQuery>,
) -> Result<Json<RoutePolyline>, AppError> {
    let controller = GeocodingController::new(state.geocoding.clone(), state.routing.clone());
    Ok(Json(controller.route(query).await?))
}
