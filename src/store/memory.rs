//! Implementación en memoria del document store
//!
//! Usada por los tests de integración y para correr el servicio embebido sin
//! PostgreSQL. Toda mutación toma el write lock, por lo que los updates
//! condicionales y los batch son atómicos frente a escritores concurrentes.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use super::{
    matches_all, ChangeEvent, ChangeKind, Document, DocumentStore, Predicate, StoreError,
    Subscription, WriteOp,
};

type Collections = HashMap<String, HashMap<String, Value>>;

pub struct MemoryStore {
    collections: Arc<RwLock<Collections>>,
    events: broadcast::Sender<ChangeEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    fn emit(&self, kind: ChangeKind, collection: &str, id: &str, data: &Value) {
        // Sin suscriptores el send falla; es irrelevante.
        let _ = self.events.send(ChangeEvent {
            kind,
            collection: collection.to_string(),
            id: id.to_string(),
            data: data.clone(),
        });
    }

    /// Merge superficial de campos sobre un documento; `null` elimina el campo
    fn apply_fields(doc: &mut Value, fields: &Map<String, Value>) {
        if let Value::Object(map) = doc {
            for (key, value) in fields {
                if value.is_null() {
                    map.remove(key);
                } else {
                    map.insert(key.clone(), value.clone());
                }
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        {
            let mut collections = self.collections.write().await;
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), data.clone());
        }
        self.emit(ChangeKind::Added, collection, &id, &data);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        guard: &[Predicate],
    ) -> Result<(), StoreError> {
        let updated = {
            let mut collections = self.collections.write().await;
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;

            // El guard se evalúa contra el documento persistido en el momento
            // de la escritura, bajo el mismo lock que la mutación.
            if !matches_all(doc, guard) {
                return Err(StoreError::GuardFailed {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }

            Self::apply_fields(doc, &fields);
            doc.clone()
        };

        self.emit(ChangeKind::Modified, collection, id, &updated);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let docs = match collections.get(collection) {
            Some(docs) => docs,
            None => return Ok(Vec::new()),
        };

        Ok(docs
            .iter()
            .filter(|(_, data)| matches_all(data, predicates))
            .map(|(id, data)| Document {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> Result<Subscription, StoreError> {
        let mut events = self.events.subscribe();
        let (tx, rx) = mpsc::channel(64);
        let collection = collection.to_string();

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if event.collection != collection || !matches_all(&event.data, &predicates)
                        {
                            continue;
                        }
                        // Receiver soltado: terminar el forwarding y descartar
                        // lo que quede en vuelo.
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("memory store subscriber lagged, skipped {}", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(Subscription::new(rx))
    }

    async fn batch_write(&self, operations: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut pending_events = Vec::with_capacity(operations.len());

        {
            let mut collections = self.collections.write().await;

            // Pre-chequear guards y existencia para que el batch sea
            // todo-o-nada antes de tocar ningún documento.
            for op in &operations {
                if let WriteOp::Update {
                    collection,
                    id,
                    guard,
                    ..
                } = op
                {
                    let doc = collections
                        .get(collection)
                        .and_then(|docs| docs.get(id))
                        .ok_or_else(|| StoreError::NotFound {
                            collection: collection.clone(),
                            id: id.clone(),
                        })?;
                    if !matches_all(doc, guard) {
                        return Err(StoreError::GuardFailed {
                            collection: collection.clone(),
                            id: id.clone(),
                        });
                    }
                }
            }

            for op in operations {
                match op {
                    WriteOp::Create {
                        collection,
                        id,
                        data,
                    } => {
                        collections
                            .entry(collection.clone())
                            .or_default()
                            .insert(id.clone(), data.clone());
                        pending_events.push((ChangeKind::Added, collection, id, data));
                    }
                    WriteOp::Update {
                        collection,
                        id,
                        fields,
                        ..
                    } => {
                        // Existencia y guard ya verificados arriba bajo este
                        // mismo write lock.
                        if let Some(doc) = collections
                            .get_mut(&collection)
                            .and_then(|docs| docs.get_mut(&id))
                        {
                            Self::apply_fields(doc, &fields);
                            let snapshot = doc.clone();
                            pending_events.push((ChangeKind::Modified, collection, id, snapshot));
                        }
                    }
                }
            }
        }

        for (kind, collection, id, data) in pending_events {
            self.emit(kind, &collection, &id, &data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn guarded_update_rejects_when_state_changed() {
        let store = MemoryStore::new();
        let id = store
            .create("taxiRequests", json!({ "status": "pending" }))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("offered"));
        store
            .update("taxiRequests", &id, fields.clone(), &[Predicate::eq("status", "pending")])
            .await
            .unwrap();

        // Segundo escritor con guard ya obsoleto
        let result = store
            .update("taxiRequests", &id, fields, &[Predicate::eq("status", "pending")])
            .await;
        assert!(matches!(result, Err(StoreError::GuardFailed { .. })));
    }

    #[tokio::test]
    async fn null_field_removes_key() {
        let store = MemoryStore::new();
        let id = store
            .create("taxiRequests", json!({ "status": "offered", "price": 20 }))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("price".to_string(), Value::Null);
        fields.insert("status".to_string(), json!("pending"));
        store.update("taxiRequests", &id, fields, &[]).await.unwrap();

        let doc = store.get("taxiRequests", &id).await.unwrap().unwrap();
        assert!(doc.get("price").is_none());
        assert_eq!(doc["status"], json!("pending"));
    }

    #[tokio::test]
    async fn batch_write_is_all_or_nothing() {
        let store = MemoryStore::new();
        let a = store
            .create("taxiRequests", json!({ "commissionStatus": false }))
            .await
            .unwrap();
        let b = store
            .create("taxiRequests", json!({ "commissionStatus": "paid" }))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("commissionStatus".to_string(), json!("pending_approval"));

        let ops = vec![
            WriteOp::Update {
                collection: "taxiRequests".to_string(),
                id: a.clone(),
                fields: fields.clone(),
                guard: vec![Predicate::eq("commissionStatus", false)],
            },
            WriteOp::Update {
                collection: "taxiRequests".to_string(),
                id: b.clone(),
                fields,
                guard: vec![Predicate::eq("commissionStatus", false)],
            },
        ];

        assert!(store.batch_write(ops).await.is_err());

        // El primer documento no debe haber cambiado
        let doc = store.get("taxiRequests", &a).await.unwrap().unwrap();
        assert_eq!(doc["commissionStatus"], json!(false));
    }

    #[tokio::test]
    async fn subscription_filters_by_predicate() {
        let store = MemoryStore::new();
        let mut sub = store
            .subscribe("taxiRequests", vec![Predicate::eq("status", "pending")])
            .await
            .unwrap();

        store
            .create("taxiRequests", json!({ "status": "cancelled" }))
            .await
            .unwrap();
        let id = store
            .create("taxiRequests", json!({ "status": "pending" }))
            .await
            .unwrap();

        let event = sub.next().await.unwrap();
        assert_eq!(event.id, id);
        assert_eq!(event.kind, ChangeKind::Added);
    }
}
