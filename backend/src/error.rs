//! Error handling for the ERP backend
//!
//! Provides consistent JSON error responses and the error taxonomy of the
//! import pipeline.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::EntityKind;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Import errors
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Source could not be read: {0}")]
    SourceUnreadable(String),

    #[error("{kind} '{name}' was not resolved in this run")]
    ForeignKeyMissing { kind: EntityKind, name: String },

    #[error("Could not resolve {kind} '{name}': {reason}")]
    EntityResolution {
        kind: EntityKind,
        name: String,
        reason: String,
    },

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a field validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, field) = match &self {
            AppError::Validation { field, .. } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", Some(field.clone()))
            }
            AppError::DuplicateEntry(field) => {
                (StatusCode::CONFLICT, "DUPLICATE_ENTRY", Some(field.clone()))
            }
            AppError::Conflict { resource, .. } => {
                (StatusCode::CONFLICT, "CONFLICT", Some(resource.clone()))
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND", None),
            AppError::SourceNotFound(_) => (StatusCode::NOT_FOUND, "SOURCE_NOT_FOUND", None),
            AppError::SourceUnreadable(_) => {
                (StatusCode::BAD_REQUEST, "SOURCE_UNREADABLE", None)
            }
            AppError::ForeignKeyMissing { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "FOREIGN_KEY_MISSING", None)
            }
            AppError::EntityResolution { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "ENTITY_RESOLUTION_ERROR", None)
            }
            AppError::Transaction(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "TRANSACTION_FAILED", None)
            }
            AppError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR", None)
            }
            AppError::DatabaseError(_) | AppError::MigrationError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", None)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        };

        // Database internals stay in the log
        let message = match &self {
            AppError::DatabaseError(_) | AppError::MigrationError(_) => {
                "A database error occurred".to_string()
            }
            AppError::NotFound(resource) => format!("{} not found", resource),
            AppError::DuplicateEntry(field) => {
                format!("A record with this {} already exists", field)
            }
            AppError::Validation { message, .. } | AppError::Conflict { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        let detail = ErrorDetail {
            code: code.to_string(),
            message,
            field,
        };
        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;
