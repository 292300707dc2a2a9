//! Servicio de notificaciones
//!
//! Escribe documentos en la colección `notifications` que los clientes
//! escuchan en vivo. Fire-and-forget: una falla se loguea y jamás se propaga
//! ni revierte la operación que la originó.

use std::sync::Arc;

use chrono::Utc;

use crate::models::notification::{Notification, NOTIFICATIONS_COLLECTION};
use crate::store::DocumentStore;

pub struct NotificationService {
    store: Arc<dyn DocumentStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Encolar una notificación para un usuario
    pub async fn notify(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        metadata: Option<serde_json::Value>,
    ) {
        let notification = Notification {
            user_id: user_id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            metadata,
            read: false,
            created_at: Utc::now(),
        };

        let data = match serde_json::to_value(&notification) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("notification serialization failed: {}", e);
                return;
            }
        };

        if let Err(e) = self.store.create(NOTIFICATIONS_COLLECTION, data).await {
            tracing::warn!("notification delivery to {} failed: {}", user_id, e);
        }
    }
}
