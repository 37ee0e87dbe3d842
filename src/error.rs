//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),
    #[error("invalid setting {name}: {message}")]
    InvalidSetting { name: &'static str, message: String },
    #[error("duplicate model id: {0}")]
    DuplicateModel(String),
    #[error("invalid identifier for {kind}: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("model not found: {0}")]
    ModelNotFound(String),
    #[error("container not found: {0}")]
    ContainerNotFound(String),
    #[error("entity not found: {container} [{key}]")]
    EntityNotFound { container: String, key: String },
    #[error("malformed key '{key}' for {container}: {reason}")]
    MalformedKey {
        container: String,
        key: String,
        reason: String,
    },
    #[error("bad value for attribute {attribute}: {message}")]
    Validation { attribute: String, message: String },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status and stable error code for this failure kind.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::ModelNotFound(_) => (StatusCode::NOT_FOUND, "model_not_found"),
            AppError::ContainerNotFound(_) => (StatusCode::NOT_FOUND, "container_not_found"),
            AppError::EntityNotFound { .. } => (StatusCode::NOT_FOUND, "entity_not_found"),
            AppError::MalformedKey { .. } => (StatusCode::BAD_REQUEST, "malformed_key"),
            AppError::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failure"),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::EntityNotFound { container, key } => Some(serde_json::json!({
                "container": container,
                "key": key,
            })),
            AppError::MalformedKey { container, key, .. } => Some(serde_json::json!({
                "container": container,
                "key": key,
            })),
            AppError::Validation { attribute, .. } => Some(serde_json::json!({ "attribute": attribute })),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
