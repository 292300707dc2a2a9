//! Routes module
//!
//! Routers por recurso montados bajo /api, más health y métricas.

pub mod billing_routes;
pub mod geocoding_routes;
pub mod offer_routes;
pub mod settings_routes;
pub mod trip_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::json;

use crate::metrics;
use crate::state::AppState;

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/trips", trip_routes::create_trip_router())
        .nest("/api/offers", offer_routes::create_offer_router())
        .nest("/api/billing", billing_routes::create_billing_router())
        .nest("/api/settings", settings_routes::create_settings_router())
        .nest("/api/geocoding", geocoding_routes::create_geocoding_router())
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "service": "taxi-marketplace",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn metrics_endpoint() -> String {
    metrics::render()
}
