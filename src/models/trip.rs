//! Modelo de TripRequest
//!
//! Este módulo contiene la solicitud de viaje (documento central del sistema),
//! el enum de estados con su tabla de transiciones y el estado de comisión.
//! Los nombres de campo serializados mantienen el esquema camelCase de la
//! colección `taxiRequests`.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use super::location::{Destination, GeoPoint};

/// Nombre de la colección de viajes en el document store
pub const TRIPS_COLLECTION: &str = "taxiRequests";

/// Estado del viaje
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    Offered,
    Accepted,
    DriverArrived,
    InProgress,
    Completed,
    Cancelled,
}

/// Evento que dispara una transición de estado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripEvent {
    /// Un conductor envía una oferta de precio
    DriverOffered,
    /// El pasajero acepta la oferta
    PassengerAccepted,
    /// El pasajero rechaza la oferta; el viaje vuelve al pool
    PassengerDeclined,
    /// El conductor asignado libera el viaje (retira oferta o abandona)
    DriverReleased,
    /// Llegada al punto de recogida (por proximidad o manual)
    ArrivedAtPickup,
    /// El conductor inicia la navegación al destino
    TripStarted,
    /// Llegada al destino o cierre manual del conductor
    TripCompleted,
    /// Cancelación del pasajero o del sistema
    TripCancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Pending => "pending",
            TripStatus::Offered => "offered",
            TripStatus::Accepted => "accepted",
            TripStatus::DriverArrived => "driver_arrived",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Estados en los que el pasajero tiene un viaje "vivo"; a lo sumo uno
    /// por pasajero puede existir a la vez.
    pub const ACTIVE: [TripStatus; 5] = [
        TripStatus::Pending,
        TripStatus::Offered,
        TripStatus::Accepted,
        TripStatus::DriverArrived,
        TripStatus::InProgress,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Tabla de transiciones. Total: todo par (estado, evento) produce el
    /// estado siguiente o `None` como rechazo explícito.
    pub fn next(self, event: TripEvent) -> Option<TripStatus> {
        use TripEvent::*;
        use TripStatus::*;

        match (self, event) {
            (Pending, DriverOffered) => Some(Offered),
            (Offered, PassengerAccepted) => Some(Accepted),
            (Offered, PassengerDeclined) => Some(Pending),
            (Offered, DriverReleased) => Some(Pending),
            (Accepted, DriverReleased) => Some(Pending),
            (Accepted, ArrivedAtPickup) => Some(DriverArrived),
            (DriverArrived, TripStarted) => Some(InProgress),
            (InProgress, TripCompleted) => Some(Completed),
            (Pending, TripCancelled) | (Offered, TripCancelled) | (Accepted, TripCancelled) => {
                Some(Cancelled)
            }
            _ => None,
        }
    }
}

/// Tipo de vehículo solicitado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Motorcycle,
    Sedan,
    Truck,
}

/// Estado de la comisión de un viaje completado.
///
/// Serializa al campo histórico `commissionStatus`:
/// `false` (sin pagar), `"pending_approval"` o `"paid"`. Al leer, un booleano
/// `true` heredado de registros viejos cuenta como pagado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommissionStatus {
    #[default]
    Unpaid,
    PendingApproval,
    Paid,
}

impl Serialize for CommissionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CommissionStatus::Unpaid => serializer.serialize_bool(false),
            CommissionStatus::PendingApproval => {
                serializer.serialize_str("pending_approval")
            }
            CommissionStatus::Paid => serializer.serialize_str("paid"),
        }
    }
}

impl<'de> Deserialize<'de> for CommissionStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatusVisitor;

        impl<'de> Visitor<'de> for StatusVisitor {
            type Value = CommissionStatus;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("false, true, \"pending_approval\" or \"paid\"")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                // `true` solo existe en documentos anteriores al flujo de
                // aprobación; se trata como saldado.
                Ok(if v {
                    CommissionStatus::Paid
                } else {
                    CommissionStatus::Unpaid
                })
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                match v {
                    "pending_approval" => Ok(CommissionStatus::PendingApproval),
                    "paid" => Ok(CommissionStatus::Paid),
                    other => Err(de::Error::unknown_variant(
                        other,
                        &["pending_approval", "paid"],
                    )),
                }
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

/// Solicitud de viaje: el documento compartido que todos los actores mutan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    /// ID corto de 5 dígitos visible para humanos; sin garantía de unicidad
    pub trip_id: String,
    pub status: TripStatus,

    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_phone: Option<String>,

    /// Ausente solo en documentos anteriores al matching por tipo; esos
    /// viajes quedan fuera de todos los pools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,

    /// Punto de recogida
    pub location: GeoPoint,
    pub address: String,
    pub destination: Destination,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,

    /// Posición viva del conductor durante el tracking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_location: Option<GeoPoint>,
    /// Posición del conductor congelada al momento de ofertar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_start_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_arrived: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,

    /// Porcentaje de comisión congelado al crear la solicitud; nunca se
    /// recalcula desde la tasa global vigente.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_percentage: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_status: Option<CommissionStatus>,

    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Viaje leído del store junto con su id de documento
#[derive(Debug, Clone, Serialize)]
pub struct TripDoc {
    pub id: String,
    #[serde(flatten)]
    pub trip: TripRequest,
}

/// Generar el tripId corto: 5 dígitos decimales, colisiones posibles
pub fn generate_trip_id() -> String {
    let n: u32 = rand::thread_rng().gen_range(10_000..100_000);
    n.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn happy_path_transitions() {
        use TripEvent::*;

        let mut status = TripStatus::Pending;
        for event in [
            DriverOffered,
            PassengerAccepted,
            ArrivedAtPickup,
            TripStarted,
            TripCompleted,
        ] {
            status = status.next(event).expect("valid transition");
        }
        assert_eq!(status, TripStatus::Completed);
    }

    #[test]
    fn decline_returns_to_pending() {
        let status = TripStatus::Offered
            .next(TripEvent::PassengerDeclined)
            .unwrap();
        assert_eq!(status, TripStatus::Pending);
    }

    #[test]
    fn terminal_states_reject_everything() {
        use TripEvent::*;

        for terminal in [TripStatus::Completed, TripStatus::Cancelled] {
            for event in [
                DriverOffered,
                PassengerAccepted,
                PassengerDeclined,
                DriverReleased,
                ArrivedAtPickup,
                TripStarted,
                TripCompleted,
                TripCancelled,
            ] {
                assert_eq!(terminal.next(event), None, "{:?} + {:?}", terminal, event);
            }
        }
    }

    #[test]
    fn cancel_is_not_allowed_once_in_progress() {
        assert_eq!(TripStatus::DriverArrived.next(TripEvent::TripCancelled), None);
        assert_eq!(TripStatus::InProgress.next(TripEvent::TripCancelled), None);
    }

    #[test]
    fn trip_id_is_five_digits() {
        for _ in 0..100 {
            let id = generate_trip_id();
            assert_eq!(id.len(), 5);
            assert!(id.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn commission_status_roundtrip_and_legacy_bool() {
        assert_eq!(
            serde_json::to_value(CommissionStatus::Unpaid).unwrap(),
            json!(false)
        );
        assert_eq!(
            serde_json::to_value(CommissionStatus::PendingApproval).unwrap(),
            json!("pending_approval")
        );

        let legacy: CommissionStatus = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(legacy, CommissionStatus::Paid);

        let unpaid: CommissionStatus = serde_json::from_value(json!(false)).unwrap();
        assert_eq!(unpaid, CommissionStatus::Unpaid);
    }

    #[test]
    fn trip_serializes_with_camel_case_fields() {
        let trip = TripRequest {
            trip_id: "12345".to_string(),
            status: TripStatus::Pending,
            user_id: "u1".to_string(),
            user_name: Some("Ana".to_string()),
            user_email: None,
            user_photo: None,
            user_phone: None,
            vehicle_type: Some(VehicleType::Sedan),
            location: GeoPoint::new(8.29, -62.72),
            address: "Alta Vista".to_string(),
            destination: Destination {
                latitude: 8.35,
                longitude: -62.65,
                address: "Unare".to_string(),
            },
            driver_id: None,
            driver_name: None,
            driver_photo: None,
            driver_email: None,
            driver_phone: None,
            driver_location: None,
            driver_start_location: None,
            driver_arrived: None,
            price: None,
            service_percentage: Some(10),
            commission_status: None,
            created_at: Utc::now(),
            offered_at: None,
            accepted_at: None,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
        };

        let value = serde_json::to_value(&trip).unwrap();
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["vehicleType"], json!("sedan"));
        assert_eq!(value["servicePercentage"], json!(10));
        assert_eq!(value["userId"], json!("u1"));
        // Campos opcionales ausentes no deben aparecer en el documento
        assert!(value.get("driverId").is_none());
        assert!(value.get("price").is_none());
    }
}
