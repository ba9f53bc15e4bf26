use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::models::ValidationError;

/// Shown to the operator whenever a draft is rejected.
pub const VALIDATION_MESSAGE: &str =
    "Por favor, completa todos los campos y selecciona al menos una imagen.";

#[derive(Debug)]
pub enum AppError {
    DatabaseError(sqlx::Error),
    ConfigError(String),
    InternalError(String),
    StorageError(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Validation(Vec<ValidationError>),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "error de base de datos: {}", e),
            AppError::ConfigError(msg) => write!(f, "error de configuración: {}", msg),
            AppError::InternalError(msg) => write!(f, "error interno: {}", msg),
            AppError::StorageError(msg) => write!(f, "error de almacenamiento: {}", msg),
            AppError::NotFound(msg) => write!(f, "no encontrado: {}", msg),
            AppError::BadRequest(msg) => write!(f, "solicitud inválida: {}", msg),
            AppError::Conflict(msg) => write!(f, "conflicto: {}", msg),
            AppError::Validation(errors) => {
                let codes: Vec<&str> = errors.iter().map(|e| e.code()).collect();
                write!(f, "{} ({})", VALIDATION_MESSAGE, codes.join(", "))
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(err.into())
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON inválido: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, codes) = match self {
            AppError::DatabaseError(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Hubo un error al guardar el producto.".to_string(),
                    None,
                )
            }
            AppError::ConfigError(ref msg) => {
                tracing::error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error de configuración del servidor".to_string(),
                    None,
                )
            }
            AppError::InternalError(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), None)
            }
            AppError::StorageError(ref msg) => {
                tracing::error!("Storage error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Hubo un error al subir las imágenes.".to_string(),
                    None,
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                VALIDATION_MESSAGE.to_string(),
                Some(errors.iter().map(|e| e.code()).collect::<Vec<_>>()),
            ),
        };

        let body = match codes {
            Some(codes) => Json(json!({
                "message": error_message,
                "errors": codes,
            })),
            None => Json(json!({
                "message": error_message,
            })),
        };

        (status, body).into_response()
    }
}
