//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del sistema
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    /// El guard de la transición falló: el estado del viaje cambió desde la
    /// última lectura del caller. Recuperable; releer y reintentar.
    #[error("Stale state: {0}")]
    StaleState(String),

    /// Otro conductor ya ofertó sobre la solicitud.
    #[error("Already offered: {0}")]
    AlreadyOffered(String),

    /// El viaje no está en estado `offered`.
    #[error("Not offered: {0}")]
    NotOffered(String),

    /// El caller no es el dueño del recurso.
    #[error("Not owner: {0}")]
    NotOwner(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Empty reference: {0}")]
    EmptyReference(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),

    /// Falla del oráculo de geocoding/rutas (Nominatim, OSRM).
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Cada rechazo de negocio lleva un código propio: el cliente necesita
        // distinguir "otro conductor la tomó" de "la oferta ya no es válida"
        // de "no puedes hacer eso" para decidir si reintenta o abandona.
        let (status, error_response) = match self {
            AppError::StaleState(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Stale State".to_string(),
                    message: msg,
                    details: None,
                    code: Some("STALE_STATE".to_string()),
                },
            ),

            AppError::AlreadyOffered(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Already Offered".to_string(),
                    message: msg,
                    details: None,
                    code: Some("ALREADY_OFFERED".to_string()),
                },
            ),

            AppError::NotOffered(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "Not Offered".to_string(),
                    message: msg,
                    details: None,
                    code: Some("NOT_OFFERED".to_string()),
                },
            ),

            AppError::NotOwner(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse {
                    error: "Not Owner".to_string(),
                    message: msg,
                    details: None,
                    code: Some("NOT_OWNER".to_string()),
                },
            ),

            AppError::InvalidPrice(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid Price".to_string(),
                    message: msg,
                    details: None,
                    code: Some("INVALID_PRICE".to_string()),
                },
            ),

            AppError::EmptyReference(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Empty Reference".to_string(),
                    message: msg,
                    details: None,
                    code: Some("EMPTY_REFERENCE".to_string()),
                },
            ),

            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "Not Found".to_string(),
                    message: msg,
                    details: None,
                    code: Some("NOT_FOUND".to_string()),
                },
            ),

            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse {
                        error: "Store Unavailable".to_string(),
                        message: "An error occurred while accessing the document store"
                            .to_string(),
                        details: Some(json!({ "store_error": e.to_string() })),
                        code: Some("STORE_UNAVAILABLE".to_string()),
                    },
                )
            }

            AppError::OracleUnavailable(msg) => {
                tracing::warn!("Oracle unavailable: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse {
                        error: "Oracle Unavailable".to_string(),
                        message: msg,
                        details: None,
                        code: Some("ORACLE_UNAVAILABLE".to_string()),
                    },
                )
            }

            AppError::Validation(e) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Validation Error".to_string(),
                    message: "The provided data is invalid".to_string(),
                    details: Some(json!(e)),
                    code: Some("VALIDATION_ERROR".to_string()),
                },
            ),

            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Bad Request".to_string(),
                    message: msg,
                    details: None,
                    code: Some("BAD_REQUEST".to_string()),
                },
            ),

            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Internal Server Error".to_string(),
                        message: msg,
                        details: None,
                        code: Some("INTERNAL_ERROR".to_string()),
                    },
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rejections_map_to_distinct_codes() {
        let cases = [
            (AppError::StaleState("x".into()), StatusCode::CONFLICT),
            (AppError::AlreadyOffered("x".into()), StatusCode::CONFLICT),
            (AppError::NotOffered("x".into()), StatusCode::CONFLICT),
            (AppError::NotOwner("x".into()), StatusCode::FORBIDDEN),
            (AppError::InvalidPrice("x".into()), StatusCode::BAD_REQUEST),
            (AppError::EmptyReference("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        ];

        for (err, expected) in cases {
            let response = err.into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
