//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y variables de
//! configuración. Todos los valores tienen default para poder levantar el
//! servicio sin entorno (modo store en memoria).

use std::env;

use crate::services::tracking_service::{
    ArrivalDetector, ARRIVAL_THRESHOLD_DEGREES_SQ, DEFAULT_ARRIVAL_RADIUS_METERS,
};

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// Conexión a PostgreSQL; sin ella el store corre en memoria
    pub database_url: Option<String>,
    pub nominatim_base_url: String,
    /// Restricción de país para la búsqueda de direcciones
    pub nominatim_country_code: String,
    pub osrm_base_url: String,
    /// Variante corregida de detección de llegada (haversine en metros)
    pub arrival_use_haversine: bool,
    pub arrival_radius_meters: f64,
    /// Cadencia del barrido de solicitudes pendientes viejas
    pub sweep_interval_secs: u64,
    /// Antigüedad máxima de una solicitud pendiente antes de cancelarla
    pub stale_trip_max_age_secs: i64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .collect()
                })
                .unwrap_or_default(),
            database_url: env::var("DATABASE_URL").ok(),
            nominatim_base_url: env::var("NOMINATIM_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            nominatim_country_code: env::var("NOMINATIM_COUNTRY_CODE")
                .unwrap_or_else(|_| "ve".to_string()),
            osrm_base_url: env::var("OSRM_BASE_URL")
                .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
            arrival_use_haversine: env::var("ARRIVAL_USE_HAVERSINE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            arrival_radius_meters: env::var("ARRIVAL_RADIUS_METERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ARRIVAL_RADIUS_METERS),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            stale_trip_max_age_secs: env::var("STALE_TRIP_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Detector de llegada según configuración
    pub fn arrival_detector(&self) -> ArrivalDetector {
        if self.arrival_use_haversine {
            ArrivalDetector::Haversine {
                radius_meters: self.arrival_radius_meters,
            }
        } else {
            ArrivalDetector::SquaredDegrees {
                threshold: ARRIVAL_THRESHOLD_DEGREES_SQ,
            }
        }
    }

    /// Antigüedad máxima de solicitudes pendientes
    pub fn stale_trip_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_trip_max_age_secs)
    }
}
