//! Modelo de Payment
//!
//! Reporte de pago de comisiones: lo crea un conductor al saldar su deuda
//! acumulada y lo resuelve un administrador exactamente una vez.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Nombre de la colección de pagos en el document store
pub const PAYMENTS_COLLECTION: &str = "payments";

/// Estado del reporte de pago
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Approved | PaymentStatus::Rejected)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub driver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,

    /// Deuda total al momento del reporte; debe coincidir con la suma de las
    /// comisiones de `trip_ids`
    pub amount: Decimal,
    /// Comprobante de la transferencia o pago móvil, texto libre no vacío
    pub reference_number: String,
    pub status: PaymentStatus,

    /// Viajes cuya comisión salda este pago
    pub trip_ids: Vec<String>,
    pub trips_count: u32,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// Pago leído del store junto con su id de documento
#[derive(Debug, Clone, Serialize)]
pub struct PaymentDoc {
    pub id: String,
    #[serde(flatten)]
    pub payment: Payment,
}
