//! Servicio de comisiones
//!
//! Calcula la comisión por viaje, agrega la deuda pendiente del conductor y
//! maneja el ciclo reporte → aprobación/rechazo. La deuda nunca se cachea:
//! se recalcula desde los viajes fuente en cada consulta.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{json, Map};

use crate::metrics;
use crate::models::payment::{Payment, PaymentDoc, PaymentStatus};
use crate::models::settings::DEFAULT_SERVICE_PERCENTAGE;
use crate::models::trip::{CommissionStatus, TripDoc, TripRequest};
use crate::repositories::{PaymentRepository, SettingsRepository, TripRepository, UserRepository};
use crate::store::{DocumentStore, StoreError};
use crate::utils::errors::AppError;

/// Motivo por defecto cuando el administrador rechaza sin explicar
pub const DEFAULT_REJECTION_REASON: &str = "Rechazado por administrador";

/// Proveedor de la tasa de comisión vigente.
///
/// Inyectado explícitamente en la creación de viajes (snapshot) y en el
/// fallback del ledger para viajes viejos sin snapshot, de modo que la
/// distinción snapshot-vs-vigente quede testeable sustituyendo el proveedor.
#[async_trait::async_trait]
pub trait CommissionRateProvider: Send + Sync {
    async fn current_rate(&self) -> Result<u32, AppError>;
}

/// Proveedor respaldado por el documento `settings/general`
pub struct StoredRateProvider {
    settings: SettingsRepository,
}

impl StoredRateProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            settings: SettingsRepository::new(store),
        }
    }
}

#[async_trait::async_trait]
impl CommissionRateProvider for StoredRateProvider {
    async fn current_rate(&self) -> Result<u32, AppError> {
        let setting = self.settings.get().await?;
        Ok(setting
            .map(|s| s.service_percentage)
            .unwrap_or(DEFAULT_SERVICE_PERCENTAGE))
    }
}

/// Tasa fija, para tests y despliegues sin documento de configuración
pub struct FixedRateProvider(pub u32);

#[async_trait::async_trait]
impl CommissionRateProvider for FixedRateProvider {
    async fn current_rate(&self) -> Result<u32, AppError> {
        Ok(self.0)
    }
}

/// Comisión de un viaje: `price * tasa / 100`.
///
/// La tasa es el snapshot del viaje si existe; `current_rate` solo aplica a
/// viajes anteriores al snapshotting. Función pura y reproducible.
pub fn commission_for(trip: &TripRequest, current_rate: u32) -> Decimal {
    let price = trip.price.unwrap_or(Decimal::ZERO);
    let rate = trip.service_percentage.unwrap_or(current_rate);
    price * Decimal::from(rate) / Decimal::from(100u32)
}

/// Deuda pendiente de un conductor con sus viajes fuente
#[derive(Debug)]
pub struct OutstandingDebt {
    pub amount: Decimal,
    pub trips: Vec<TripDoc>,
    /// Tasa global vigente usada como fallback para viajes sin snapshot
    pub current_rate: u32,
}

pub struct CommissionService {
    trips: TripRepository,
    payments: PaymentRepository,
    users: UserRepository,
    rate_provider: Arc<dyn CommissionRateProvider>,
}

impl CommissionService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        rate_provider: Arc<dyn CommissionRateProvider>,
    ) -> Self {
        Self {
            trips: TripRepository::new(store.clone()),
            payments: PaymentRepository::new(store.clone()),
            users: UserRepository::new(store),
            rate_provider,
        }
    }

    /// Deuda pendiente: suma de comisiones de viajes completados sin pagar.
    ///
    /// Recalculada on-demand desde los documentos, para que cualquier
    /// corrección (p.ej. un rechazo) se refleje sin estado intermedio.
    pub async fn outstanding_debt(&self, driver_id: &str) -> Result<OutstandingDebt, AppError> {
        let current_rate = self.rate_provider.current_rate().await?;
        let completed = self.trips.find_completed_by_driver(driver_id).await?;

        let mut unpaid: Vec<TripDoc> = completed
            .into_iter()
            .filter(|doc| {
                matches!(doc.trip.commission_status, Some(CommissionStatus::Unpaid))
            })
            .collect();

        // Más recientes primero, como la vista de facturación
        unpaid.sort_by(|a, b| {
            let date_a = a.trip.completed_at.unwrap_or(a.trip.created_at);
            let date_b = b.trip.completed_at.unwrap_or(b.trip.created_at);
            date_b.cmp(&date_a)
        });

        let amount = unpaid
            .iter()
            .map(|doc| commission_for(&doc.trip, current_rate))
            .sum();

        Ok(OutstandingDebt {
            amount,
            trips: unpaid,
            current_rate,
        })
    }

    /// El conductor reporta haber transferido su deuda acumulada.
    ///
    /// Crea el Payment y marca todos los viajes referenciados como
    /// `pending_approval` en un solo batch atómico; una aplicación parcial
    /// sería una violación de consistencia.
    pub async fn report_payment(
        &self,
        driver_id: &str,
        reference_number: &str,
    ) -> Result<PaymentDoc, AppError> {
        let reference = reference_number.trim();
        if reference.is_empty() {
            return Err(AppError::EmptyReference(
                "Ingresa el número de referencia del pago".to_string(),
            ));
        }

        // Solo conductores: perfil con vehículo registrado
        let profile = self
            .users
            .find_by_id(driver_id)
            .await?
            .filter(|p| p.has_vehicle)
            .ok_or_else(|| {
                AppError::NotOwner("Esta sección es solo para conductores".to_string())
            })?;

        let debt = self.outstanding_debt(driver_id).await?;
        if debt.trips.is_empty() {
            return Err(AppError::BadRequest(
                "No tienes comisiones pendientes de pago".to_string(),
            ));
        }

        let payment = Payment {
            driver_id: driver_id.to_string(),
            driver_name: profile.display_name.clone(),
            driver_email: profile.email.clone(),
            driver_phone: profile.phone.clone(),
            amount: debt.amount,
            reference_number: reference.to_string(),
            status: PaymentStatus::Pending,
            trip_ids: debt.trips.iter().map(|t| t.id.clone()).collect(),
            trips_count: debt.trips.len() as u32,
            created_at: Utc::now(),
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
        };

        let payment_id = match self.payments.create_report(&payment).await {
            Ok(id) => id,
            Err(StoreError::GuardFailed { .. }) => {
                // Algún viaje cambió entre la lectura de deuda y el batch
                return Err(AppError::StaleState(
                    "Tu deuda cambió mientras reportabas el pago; vuelve a intentarlo"
                        .to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        metrics::PAYMENTS_REPORTED.inc();
        tracing::info!(
            "payment {} reported by driver {} for {} trips (${})",
            payment_id,
            driver_id,
            payment.trips_count,
            payment.amount
        );

        Ok(PaymentDoc {
            id: payment_id,
            payment,
        })
    }

    /// Todos los reportes de pago, más recientes primero
    pub async fn list_payments(&self) -> Result<Vec<PaymentDoc>, AppError> {
        Ok(self.payments.list_all().await?)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<PaymentDoc, AppError> {
        self.payments
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pago no encontrado".to_string()))
    }

    /// Aprobar un pago pendiente: el pago queda `approved` y todos sus viajes
    /// `paid`, en un solo batch. Aplicable exactamente una vez.
    pub async fn approve_payment(&self, payment_id: &str) -> Result<PaymentDoc, AppError> {
        let doc = self.get_payment(payment_id).await?;
        if doc.payment.status.is_terminal() {
            return Err(AppError::StaleState(
                "El pago ya fue resuelto por un administrador".to_string(),
            ));
        }

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("approved"));
        fields.insert("approvedAt".to_string(), json!(Utc::now()));

        match self
            .payments
            .resolve(payment_id, fields, &doc.payment.trip_ids, json!("paid"))
            .await
        {
            Ok(()) => {}
            Err(StoreError::GuardFailed { .. }) => {
                return Err(AppError::StaleState(
                    "El pago ya fue resuelto por un administrador".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        metrics::PAYMENTS_APPROVED.inc();
        tracing::info!("payment {} approved", payment_id);
        self.get_payment(payment_id).await
    }

    /// Rechazar un pago pendiente: el pago queda `rejected` y la comisión de
    /// sus viajes vuelve a `false` (deuda pendiente otra vez).
    pub async fn reject_payment(
        &self,
        payment_id: &str,
        reason: Option<String>,
    ) -> Result<PaymentDoc, AppError> {
        let doc = self.get_payment(payment_id).await?;
        if doc.payment.status.is_terminal() {
            return Err(AppError::StaleState(
                "El pago ya fue resuelto por un administrador".to_string(),
            ));
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("rejected"));
        fields.insert("rejectedAt".to_string(), json!(Utc::now()));
        fields.insert("rejectionReason".to_string(), json!(reason));

        match self
            .payments
            .resolve(payment_id, fields, &doc.payment.trip_ids, json!(false))
            .await
        {
            Ok(()) => {}
            Err(StoreError::GuardFailed { .. }) => {
                return Err(AppError::StaleState(
                    "El pago ya fue resuelto por un administrador".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        metrics::PAYMENTS_REJECTED.inc();
        tracing::info!("payment {} rejected", payment_id);
        self.get_payment(payment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::{TripRequest, TripStatus};
    use crate::models::{Destination, GeoPoint};

    fn trip_with(price: Option<Decimal>, snapshot: Option<u32>) -> TripRequest {
        TripRequest {
            trip_id: "12345".to_string(),
            status: TripStatus::Completed,
            user_id: "u1".to_string(),
            user_name: None,
            user_email: None,
            user_photo: None,
            user_phone: None,
            vehicle_type: None,
            location: GeoPoint::new(8.29, -62.72),
            address: "Alta Vista".to_string(),
            destination: Destination {
                latitude: 8.35,
                longitude: -62.65,
                address: "Unare".to_string(),
            },
            driver_id: Some("d1".to_string()),
            driver_name: None,
            driver_photo: None,
            driver_email: None,
            driver_phone: None,
            driver_location: None,
            driver_start_location: None,
            driver_arrived: None,
            price,
            service_percentage: snapshot,
            commission_status: Some(CommissionStatus::Unpaid),
            created_at: Utc::now(),
            offered_at: None,
            accepted_at: None,
            arrived_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn commission_uses_snapshot_over_current_rate() {
        // Snapshot al 10%, tasa global luego subida al 20%: la comisión de
        // un viaje de $20 sigue siendo $2.00
        let trip = trip_with(Some(Decimal::from(20)), Some(10));
        assert_eq!(commission_for(&trip, 20), Decimal::from(2));
    }

    #[test]
    fn commission_falls_back_to_current_rate_without_snapshot() {
        let trip = trip_with(Some(Decimal::from(20)), None);
        assert_eq!(commission_for(&trip, 20), Decimal::from(4));
    }

    #[test]
    fn commission_is_zero_without_price() {
        let trip = trip_with(None, Some(10));
        assert_eq!(commission_for(&trip, 20), Decimal::ZERO);
    }
}
