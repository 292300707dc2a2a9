//! Repositorio de configuración
//!
//! Lee y escribe el documento único `settings/general`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map};

use crate::models::settings::{
    CommissionRateSetting, GENERAL_SETTINGS_ID, SETTINGS_COLLECTION,
};
use crate::store::{DocumentStore, StoreError, WriteOp};

pub struct SettingsRepository {
    store: Arc<dyn DocumentStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> Result<Option<CommissionRateSetting>, StoreError> {
        match self
            .store
            .get(SETTINGS_COLLECTION, GENERAL_SETTINGS_ID)
            .await?
        {
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
            None => Ok(None),
        }
    }

    /// Guardar la nueva tasa global. Merge sobre el documento existente o
    /// creación con id fijo si aún no existe.
    pub async fn upsert_service_percentage(&self, value: u32) -> Result<(), StoreError> {
        let mut fields = Map::new();
        fields.insert("servicePercentage".to_string(), json!(value));
        fields.insert("updatedAt".to_string(), json!(Utc::now()));

        match self
            .store
            .update(SETTINGS_COLLECTION, GENERAL_SETTINGS_ID, fields.clone(), &[])
            .await
        {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => {
                self.store
                    .batch_write(vec![WriteOp::Create {
                        collection: SETTINGS_COLLECTION.to_string(),
                        id: GENERAL_SETTINGS_ID.to_string(),
                        data: serde_json::Value::Object(fields),
                    }])
                    .await
            }
            Err(e) => Err(e),
        }
    }
}
