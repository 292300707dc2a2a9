//! Document store compartido
//!
//! Este módulo define el contrato contra el almacén de documentos: registros
//! schemaless por colección, updates condicionales campo a campo, queries por
//! predicado, suscripciones a cambios y escrituras batch atómicas. Las
//! implementaciones viven en `memory` (tests / embebido) y `postgres`
//! (producción, JSONB + LISTEN/NOTIFY).

pub mod memory;
pub mod postgres;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Errores de infraestructura del store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// El update condicional no aplicó porque el documento ya no cumple el
    /// guard. Los services lo traducen al error de negocio que corresponda.
    #[error("guard condition failed for {collection}/{id}")]
    GuardFailed { collection: String, id: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Operador de comparación de un predicado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateOp {
    Eq,
    Ne,
    In,
}

/// Predicado sobre un campo de primer nivel del documento
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: PredicateOp,
    pub value: Value,
}

impl Predicate {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: PredicateOp::Eq,
            value: value.into(),
        }
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: PredicateOp::Ne,
            value: value.into(),
        }
    }

    pub fn is_in(field: &str, values: Vec<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: PredicateOp::In,
            value: Value::Array(values),
        }
    }

    /// Evaluar el predicado contra un documento.
    ///
    /// Un campo ausente nunca matchea, ni siquiera con `Ne`: el filtrado
    /// estricto excluye documentos sin el campo consultado.
    pub fn matches(&self, doc: &Value) -> bool {
        let field_value = match doc.get(&self.field) {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };

        match self.op {
            PredicateOp::Eq => field_value == &self.value,
            PredicateOp::Ne => field_value != &self.value,
            PredicateOp::In => match &self.value {
                Value::Array(candidates) => candidates.iter().any(|c| c == field_value),
                _ => false,
            },
        }
    }
}

/// Evaluar una conjunción de predicados
pub fn matches_all(doc: &Value, predicates: &[Predicate]) -> bool {
    predicates.iter().all(|p| p.matches(doc))
}

/// Documento leído del store: id + contenido
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Tipo de cambio notificado por una suscripción
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
}

/// Evento de cambio entregado a los suscriptores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub collection: String,
    pub id: String,
    pub data: Value,
}

/// Suscripción viva a cambios de una colección.
///
/// Soltar la suscripción cancela el forwarding: los eventos en vuelo
/// posteriores al teardown se descartan, no se encolan.
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { rx }
    }

    /// Próximo evento, o `None` cuando la suscripción terminó
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

/// Operación individual de una escritura batch atómica
#[derive(Debug, Clone)]
pub enum WriteOp {
    Create {
        collection: String,
        id: String,
        data: Value,
    },
    Update {
        collection: String,
        id: String,
        fields: Map<String, Value>,
        guard: Vec<Predicate>,
    },
}

/// Contrato del almacén de documentos externo.
///
/// `update` es el primitivo conditional-write-if-unchanged: el guard se
/// re-evalúa contra el documento persistido en el momento de la escritura y
/// un mismatch rechaza la mutación completa. Un valor `null` en `fields`
/// elimina el campo del documento.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        guard: &[Predicate],
    ) -> Result<(), StoreError>;

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError>;

    async fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> Result<Subscription, StoreError>;

    /// Aplicar todas las operaciones o ninguna
    async fn batch_write(&self, operations: Vec<WriteOp>) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn predicate_eq_and_in() {
        let doc = json!({ "status": "pending", "vehicleType": "sedan" });

        assert!(Predicate::eq("status", "pending").matches(&doc));
        assert!(!Predicate::eq("status", "offered").matches(&doc));
        assert!(
            Predicate::is_in("status", vec![json!("pending"), json!("offered")]).matches(&doc)
        );
    }

    #[test]
    fn absent_field_never_matches() {
        let doc = json!({ "status": "pending" });

        assert!(!Predicate::eq("vehicleType", "sedan").matches(&doc));
        assert!(!Predicate::ne("vehicleType", "sedan").matches(&doc));
    }
}
