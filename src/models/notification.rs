//! Modelo de notificación
//!
//! Documentos de la colección `notifications` que el cliente escucha y marca
//! como leídos. La entrega es best-effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: String,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
