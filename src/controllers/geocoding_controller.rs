//! Controller de geocoding y rutas
//!
//! Fachada sobre los oráculos externos. La ruta degrada a línea recta cuando
//! OSRM no responde; el caller lo ve en el flag de la respuesta.

use std::sync::Arc;

use crate::dto::geocoding_dto::{ReverseGeocodeQuery, RouteQuery, SearchAddressQuery};
use crate::models::GeoPoint;
use crate::services::geocoding_service::{AddressHit, ReverseGeocodeResult};
use crate::services::routing_service::RoutePolyline;
use crate::services::{GeocodingService, RoutingService};
use crate::utils::errors::AppError;

pub struct GeocodingController {
    geocoding: Arc<GeocodingService>,
    routing: Arc<RoutingService>,
}

impl GeocodingController {
    pub fn new(geocoding: Arc<GeocodingService>, routing: Arc<RoutingService>) -> Self {
        Self { geocoding, routing }
    }

    pub async fn reverse(
        &self,
        query: ReverseGeocodeQuery,
    ) -> Result<ReverseGeocodeResult, AppError> {
        self.geocoding.reverse_geocode(query.lat, query.lng).await
    }

    pub async fn search(
        &self,
        query: SearchAddressQuery,
    ) -> Result<Vec<AddressHit>, AppError> {
        self.geocoding
            .search_address(&query.q, query.limit.unwrap_or(1), query.region.as_deref())
            .await
    }

    pub async fn route(&self, query: RouteQuery) -> Result<RoutePolyline, AppError> {
        let start = GeoPoint::new(query.from_lat, query.from_lng);
        let end = GeoPoint::new(query.to_lat, query.to_lng);

        match self.routing.compute_route(start, end).await {
            Ok(route) => Ok(route),
            Err(AppError::OracleUnavailable(e)) => {
                tracing::warn!("route oracle unavailable, falling back: {}", e);
                Ok(RoutingService::straight_line(start, end))
            }
            Err(e) => Err(e),
        }
    }
}
