//! Métricas Prometheus
//!
//! Contadores de negocio expuestos en /metrics.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    pub static ref TRIPS_CREATED: IntCounter =
        register_int_counter!("trips_created_total", "Solicitudes de viaje creadas").unwrap();
    pub static ref TRIPS_COMPLETED: IntCounter =
        register_int_counter!("trips_completed_total", "Viajes completados").unwrap();
    pub static ref TRIPS_CANCELLED: IntCounter =
        register_int_counter!("trips_cancelled_total", "Viajes cancelados").unwrap();
    pub static ref TRIPS_SWEPT: IntCounter = register_int_counter!(
        "trips_swept_total",
        "Solicitudes pendientes canceladas por antigüedad"
    )
    .unwrap();
    pub static ref OFFERS_SUBMITTED: IntCounter =
        register_int_counter!("offers_submitted_total", "Ofertas de conductores enviadas")
            .unwrap();
    pub static ref OFFERS_ACCEPTED: IntCounter =
        register_int_counter!("offers_accepted_total", "Ofertas aceptadas por pasajeros")
            .unwrap();
    pub static ref OFFERS_DECLINED: IntCounter =
        register_int_counter!("offers_declined_total", "Ofertas rechazadas por pasajeros")
            .unwrap();
    pub static ref ARRIVALS_DETECTED: IntCounter = register_int_counter!(
        "arrivals_detected_total",
        "Llegadas detectadas por proximidad"
    )
    .unwrap();
    pub static ref PAYMENTS_REPORTED: IntCounter =
        register_int_counter!("payments_reported_total", "Reportes de pago creados").unwrap();
    pub static ref PAYMENTS_APPROVED: IntCounter =
        register_int_counter!("payments_approved_total", "Pagos aprobados").unwrap();
    pub static ref PAYMENTS_REJECTED: IntCounter =
        register_int_counter!("payments_rejected_total", "Pagos rechazados").unwrap();
}

/// Render del registro global en formato de texto Prometheus
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::warn!("metrics encoding failed: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
