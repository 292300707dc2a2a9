//! Repositorio de pagos
//!
//! Acceso a la colección `payments`. Las operaciones que tocan pago y viajes
//! a la vez se arman aquí como un solo batch atómico del store: crear el
//! reporte y marcar los viajes, o resolverlo y ajustar los viajes, nunca por
//! separado.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::models::payment::{Payment, PaymentDoc, PAYMENTS_COLLECTION};
use crate::models::trip::TRIPS_COLLECTION;
use crate::store::{Document, DocumentStore, Predicate, StoreError, WriteOp};

pub struct PaymentRepository {
    store: Arc<dyn DocumentStore>,
}

impl PaymentRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn decode(doc: Document) -> Result<PaymentDoc, StoreError> {
        let payment: Payment = serde_json::from_value(doc.data)?;
        Ok(PaymentDoc {
            id: doc.id,
            payment,
        })
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<PaymentDoc>, StoreError> {
        match self.store.get(PAYMENTS_COLLECTION, id).await? {
            Some(data) => Ok(Some(Self::decode(Document {
                id: id.to_string(),
                data,
            })?)),
            None => Ok(None),
        }
    }

    /// Todos los pagos, más recientes primero
    pub async fn list_all(&self) -> Result<Vec<PaymentDoc>, StoreError> {
        let docs = self.store.query(PAYMENTS_COLLECTION, &[]).await?;
        let mut payments = docs
            .into_iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()?;
        payments.sort_by(|a, b| b.payment.created_at.cmp(&a.payment.created_at));
        Ok(payments)
    }

    /// Crear el reporte de pago y marcar todos los viajes referenciados como
    /// `pending_approval` en una sola escritura atómica.
    ///
    /// El guard por viaje exige `completed` + comisión sin pagar: si algún
    /// viaje cambió entre la lectura de deuda y este write, el batch entero
    /// se rechaza y el conductor debe reintentar con la deuda releída.
    pub async fn create_report(&self, payment: &Payment) -> Result<String, StoreError> {
        let payment_id = Uuid::new_v4().to_string();

        let mut operations = vec![WriteOp::Create {
            collection: PAYMENTS_COLLECTION.to_string(),
            id: payment_id.clone(),
            data: serde_json::to_value(payment)?,
        }];

        for trip_id in &payment.trip_ids {
            let mut fields = Map::new();
            fields.insert("commissionStatus".to_string(), json!("pending_approval"));
            operations.push(WriteOp::Update {
                collection: TRIPS_COLLECTION.to_string(),
                id: trip_id.clone(),
                fields,
                guard: vec![
                    Predicate::eq("status", "completed"),
                    Predicate::eq("commissionStatus", false),
                ],
            });
        }

        self.store.batch_write(operations).await?;
        Ok(payment_id)
    }

    /// Resolver un pago pendiente y ajustar la comisión de sus viajes en un
    /// solo batch: `approved` + `paid`, o `rejected` + deuda de vuelta a
    /// `false`.
    ///
    /// El guard sobre el pago (`status == pending`) garantiza que la
    /// resolución se aplique exactamente una vez.
    pub async fn resolve(
        &self,
        payment_id: &str,
        payment_fields: Map<String, Value>,
        trip_ids: &[String],
        trip_commission_status: Value,
    ) -> Result<(), StoreError> {
        let mut operations = vec![WriteOp::Update {
            collection: PAYMENTS_COLLECTION.to_string(),
            id: payment_id.to_string(),
            fields: payment_fields,
            guard: vec![Predicate::eq("status", "pending")],
        }];

        for trip_id in trip_ids {
            let mut fields = Map::new();
            fields.insert(
                "commissionStatus".to_string(),
                trip_commission_status.clone(),
            );
            operations.push(WriteOp::Update {
                collection: TRIPS_COLLECTION.to_string(),
                id: trip_id.clone(),
                fields,
                guard: vec![Predicate::eq("commissionStatus", "pending_approval")],
            });
        }

        self.store.batch_write(operations).await
    }
}
