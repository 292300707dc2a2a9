//! DTOs de facturación y pagos

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::trip::TripDoc;
use crate::services::commission_service::{commission_for, OutstandingDebt};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtQuery {
    pub driver_id: String,
}

/// Fila de la tabla de deuda: un viaje completado sin pagar
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtTripResponse {
    pub id: String,
    pub trip_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    /// Porcentaje aplicado: snapshot del viaje o tasa vigente
    pub service_percentage: u32,
    pub commission: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtResponse {
    pub amount: Decimal,
    pub trips_count: u32,
    pub trips: Vec<DebtTripResponse>,
}

impl DebtResponse {
    pub fn from_debt(debt: OutstandingDebt) -> Self {
        let rows = debt
            .trips
            .iter()
            .map(|doc: &TripDoc| DebtTripResponse {
                id: doc.id.clone(),
                trip_id: doc.trip.trip_id.clone(),
                completed_at: doc.trip.completed_at,
                price: doc.trip.price,
                service_percentage: doc
                    .trip
                    .service_percentage
                    .unwrap_or(debt.current_rate),
                commission: commission_for(&doc.trip, debt.current_rate),
            })
            .collect();

        Self {
            amount: debt.amount,
            trips_count: debt.trips.len() as u32,
            trips: rows,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportPaymentRequest {
    #[validate(length(min = 1))]
    pub driver_id: String,
    pub reference_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectPaymentRequest {
    pub reason: Option<String>,
}
