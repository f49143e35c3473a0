//! Typed errors and HTTP mapping.

use crate::runtime::ResourceKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("tenant id must not be empty")]
    EmptyTenant,
    #[error("the wildcard tenant cannot be the default tenant")]
    WildcardDefaultTenant,
    #[error("no {kind} bound for tenant '{tenant}'")]
    BindingMissing { kind: ResourceKind, tenant: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("lock not obtained: {0}")]
    LockNotObtained(String),
    #[error("lease for '{0}' is no longer held")]
    LeaseLost(String),
    #[error("value at '{0}' is not an integer")]
    NotInteger(String),
    #[error("queue '{0}' is closed")]
    QueueClosed(String),
    #[error("queue '{0}' is full")]
    QueueFull(String),
    #[error("consumer: {0}")]
    Consumer(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("env: {0}")]
    Env(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum LoggerError {
    #[error("default logger already initialized")]
    AlreadyInitialized,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for RuntimeError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RuntimeError::EmptyTenant | RuntimeError::WildcardDefaultTenant => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            RuntimeError::BindingMissing { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "binding_missing"),
            RuntimeError::Storage(StorageError::LockNotObtained(_)) => (StatusCode::CONFLICT, "conflict"),
            RuntimeError::Storage(StorageError::QueueFull(_)) => (StatusCode::SERVICE_UNAVAILABLE, "queue_full"),
            RuntimeError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
