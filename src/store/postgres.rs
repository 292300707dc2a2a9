//! Document store sobre PostgreSQL
//!
//! Los documentos viven en una sola tabla JSONB (`collection`, `id`, `data`).
//! Los updates condicionales se resuelven en el WHERE del UPDATE, los batch
//! en una transacción, y las suscripciones con LISTEN/NOTIFY: un trigger
//! publica (op, collection, id) y el suscriptor relee el documento.

use serde_json::{Map, Value};
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::sync::mpsc;

use super::{
    matches_all, ChangeEvent, ChangeKind, Document, DocumentStore, Predicate, PredicateOp,
    StoreError, Subscription, WriteOp,
};

const CHANNEL: &str = "documents_changes";

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Crear tabla y trigger de notificación si no existen
    pub async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE OR REPLACE FUNCTION documents_notify() RETURNS trigger AS $$
            BEGIN
                PERFORM pg_notify('documents_changes', json_build_object(
                    'op', TG_OP,
                    'collection', NEW.collection,
                    'id', NEW.id
                )::text);
                RETURN NEW;
            END;
            $$ LANGUAGE plpgsql
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("DROP TRIGGER IF EXISTS documents_notify_trigger ON documents")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER documents_notify_trigger
            AFTER INSERT OR UPDATE ON documents
            FOR EACH ROW EXECUTE FUNCTION documents_notify()
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Traducir predicados a condiciones SQL sobre la columna JSONB
    fn push_guard(builder: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) {
        for predicate in predicates {
            match predicate.op {
                PredicateOp::Eq => {
                    builder.push(" AND data -> ");
                    builder.push_bind(predicate.field.clone());
                    builder.push(" = ");
                    builder.push_bind(predicate.value.clone());
                }
                PredicateOp::Ne => {
                    // Campo ausente no matchea, igual que en memoria
                    builder.push(" AND jsonb_exists(data, ");
                    builder.push_bind(predicate.field.clone());
                    builder.push(") AND data -> ");
                    builder.push_bind(predicate.field.clone());
                    builder.push(" <> ");
                    builder.push_bind(predicate.value.clone());
                }
                PredicateOp::In => {
                    builder.push(" AND data -> ");
                    builder.push_bind(predicate.field.clone());
                    builder.push(" = ANY(ARRAY(SELECT jsonb_array_elements(");
                    builder.push_bind(predicate.value.clone());
                    builder.push(")))");
                }
            }
        }
    }

    async fn guarded_update<'e, E>(
        executor: E,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        guard: &[Predicate],
    ) -> Result<u64, StoreError>
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        // `null` elimina el campo: merge + strip_nulls reproduce la semántica
        // de deleteField del store en memoria.
        let mut builder =
            QueryBuilder::new("UPDATE documents SET data = jsonb_strip_nulls(data || ");
        builder.push_bind(Value::Object(fields));
        builder.push(") WHERE collection = ");
        builder.push_bind(collection.to_string());
        builder.push(" AND id = ");
        builder.push_bind(id.to_string());
        Self::push_guard(&mut builder, guard);

        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    async fn classify_missed_update<'e, E>(
        executor: E,
        collection: &str,
        id: &str,
    ) -> StoreError
    where
        E: sqlx::Executor<'e, Database = Postgres>,
    {
        let exists: Result<bool, sqlx::Error> = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE collection = $1 AND id = $2)",
        )
        .bind(collection)
        .bind(id)
        .fetch_one(executor)
        .await;

        match exists {
            Ok(true) => StoreError::GuardFailed {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            Ok(false) => StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            },
            Err(e) => e.into(),
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(&data)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(data,)| data))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
        guard: &[Predicate],
    ) -> Result<(), StoreError> {
        let affected = Self::guarded_update(&self.pool, collection, id, fields, guard).await?;
        if affected == 0 {
            return Err(Self::classify_missed_update(&self.pool, collection, id).await);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        predicates: &[Predicate],
    ) -> Result<Vec<Document>, StoreError> {
        let mut builder =
            QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
        builder.push_bind(collection.to_string());
        Self::push_guard(&mut builder, predicates);

        let rows: Vec<(String, Value)> =
            builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(id, data)| Document { id, data })
            .collect())
    }

    async fn subscribe(
        &self,
        collection: &str,
        predicates: Vec<Predicate>,
    ) -> Result<Subscription, StoreError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANNEL).await?;

        let (tx, rx) = mpsc::channel(64);
        let pool = self.pool.clone();
        let collection = collection.to_string();

        tokio::spawn(async move {
            loop {
                let notification = match listener.recv().await {
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!("LISTEN {} dropped: {}", CHANNEL, e);
                        break;
                    }
                };

                let payload: Value = match serde_json::from_str(notification.payload()) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!("invalid notify payload: {}", e);
                        continue;
                    }
                };

                let (op, event_collection, id) = match (
                    payload.get("op").and_then(Value::as_str),
                    payload.get("collection").and_then(Value::as_str),
                    payload.get("id").and_then(Value::as_str),
                ) {
                    (Some(op), Some(c), Some(id)) => (op, c, id),
                    _ => continue,
                };

                if event_collection != collection {
                    continue;
                }

                // El payload de NOTIFY solo lleva la referencia; releer el
                // documento para entregar el estado vigente.
                let data: Option<(Value,)> = sqlx::query_as(
                    "SELECT data FROM documents WHERE collection = $1 AND id = $2",
                )
                .bind(&collection)
                .bind(id)
                .fetch_optional(&pool)
                .await
                .unwrap_or(None);

                let data = match data {
                    Some((data,)) => data,
                    None => continue,
                };

                if !matches_all(&data, &predicates) {
                    continue;
                }

                let event = ChangeEvent {
                    kind: if op == "INSERT" {
                        ChangeKind::Added
                    } else {
                        ChangeKind::Modified
                    },
                    collection: collection.clone(),
                    id: id.to_string(),
                    data,
                };

                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx))
    }

    async fn batch_write(&self, operations: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        for op in operations {
            match op {
                WriteOp::Create {
                    collection,
                    id,
                    data,
                } => {
                    sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
                        .bind(&collection)
                        .bind(&id)
                        .bind(&data)
                        .execute(&mut *tx)
                        .await?;
                }
                WriteOp::Update {
                    collection,
                    id,
                    fields,
                    guard,
                } => {
                    let affected =
                        Self::guarded_update(&mut *tx, &collection, &id, fields, &guard).await?;
                    if affected == 0 {
                        let err =
                            Self::classify_missed_update(&mut *tx, &collection, &id).await;
                        // Transacción abandonada: rollback implícito al soltar
                        return Err(err);
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
