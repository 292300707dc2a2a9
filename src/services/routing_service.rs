//! Servicio de rutas (OSRM)
//!
//! Calcula la polilínea de conducción entre dos puntos contra un servidor
//! OSRM público. La ruta es solo para visualización: la detección de llegada
//! trabaja sobre coordenadas crudas y no depende de este servicio. Si OSRM no
//! responde, el caller degrada a la línea recta.

use serde::{Deserialize, Serialize};

use crate::models::GeoPoint;
use crate::utils::errors::AppError;

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    // GeoJSON: pares [lon, lat]
    coordinates: Vec<[f64; 2]>,
}

/// Polilínea de ruta con metadatos de OSRM
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePolyline {
    pub points: Vec<GeoPoint>,
    /// Metros sobre la red vial; 0 cuando es el fallback en línea recta
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// `true` cuando OSRM no respondió y la ruta es solo inicio-fin
    pub straight_line_fallback: bool,
}

pub struct RoutingService {
    base_url: String,
    client: reqwest::Client,
}

impl RoutingService {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent("TaxiMarketplace/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, client }
    }

    /// Ruta de conducción entre dos puntos
    pub async fn compute_route(
        &self,
        start: GeoPoint,
        end: GeoPoint,
    ) -> Result<RoutePolyline, AppError> {
        // OSRM espera lon,lat
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson",
            self.base_url, start.longitude, start.latitude, end.longitude, end.latitude
        );

        log::info!(
            "🛣️ Computing route {},{} -> {},{}",
            start.latitude,
            start.longitude,
            end.latitude,
            end.longitude
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::OracleUnavailable(format!("OSRM: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::OracleUnavailable(format!(
                "OSRM status {}",
                response.status()
            )));
        }

        let body: OsrmResponse = response
            .json()
            .await
            .map_err(|e| AppError::OracleUnavailable(format!("OSRM body: {}", e)))?;

        if body.code != "Ok" || body.routes.is_empty() {
            return Err(AppError::OracleUnavailable(format!(
                "OSRM code {}",
                body.code
            )));
        }

        let route = &body.routes[0];
        let points = route
            .geometry
            .coordinates
            .iter()
            .map(|[lon, lat]| GeoPoint::new(*lat, *lon))
            .collect();

        Ok(RoutePolyline {
            points,
            distance_meters: route.distance,
            duration_seconds: route.duration,
            straight_line_fallback: false,
        })
    }

    /// Fallback cuando el oráculo no está disponible
    pub fn straight_line(start: GeoPoint, end: GeoPoint) -> RoutePolyline {
        RoutePolyline {
            points: vec![start, end],
            distance_meters: 0.0,
            duration_seconds: 0.0,
            straight_line_fallback: true,
        }
    }
}
