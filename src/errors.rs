//! Error taxonomy for the vault service.
//!
//! `VaultError` is the domain-level enum used throughout the service layer;
//! `AppError` is the HTTP-facing wrapper that maps each variant to a stable
//! status code and a JSON body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::blob::BlobError;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("forbidden operation")]
    Forbidden,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("vault not found")]
    VaultNotFound,
    #[error("file not found")]
    FileNotFound,
    #[error("upload not found")]
    UploadNotFound,
    #[error("vault `{0}` already exists")]
    VaultAlreadyExists(String),
    #[error("vault name `{name}` invalid: {reason}")]
    InvalidVaultName { name: String, reason: String },
    #[error("insufficient storage: {requested} bytes requested, {available} available")]
    InsufficientStorage { requested: i64, available: i64 },
    #[error("invalid declared size {0}")]
    InvalidSize(i64),
    #[error("invalid part number {0}")]
    InvalidPartNumber(i32),
    #[error("part number {part_number} exceeds declared part count {part_count}")]
    PartOutOfRange { part_number: i32, part_count: i32 },
    #[error("part {part_number} is {size} bytes, below the minimum for non-final parts")]
    ChunkTooSmall { part_number: i32, size: i64 },
    #[error("no chunks found for upload")]
    NoChunks,
    #[error("total chunk size {actual} does not match declared file size {declared}")]
    SizeMismatch { declared: i64, actual: i64 },
    #[error("{0}")]
    Internal(String),
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<VaultError> for AppError {
    fn from(err: VaultError) -> Self {
        let status = match &err {
            VaultError::Forbidden => StatusCode::FORBIDDEN,
            VaultError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            VaultError::VaultNotFound | VaultError::FileNotFound | VaultError::UploadNotFound => {
                StatusCode::NOT_FOUND
            }
            VaultError::VaultAlreadyExists(_) => StatusCode::CONFLICT,
            VaultError::InsufficientStorage { .. } => StatusCode::INSUFFICIENT_STORAGE,
            VaultError::InvalidVaultName { .. }
            | VaultError::InvalidSize(_)
            | VaultError::InvalidPartNumber(_)
            | VaultError::PartOutOfRange { .. }
            | VaultError::ChunkTooSmall { .. }
            | VaultError::NoChunks
            | VaultError::SizeMismatch { .. } => StatusCode::BAD_REQUEST,
            VaultError::Blob(_) => StatusCode::BAD_GATEWAY,
            VaultError::Internal(_) | VaultError::Sqlx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal failure details stay in the logs, not in the response body.
        let message = match &err {
            VaultError::Internal(_) | VaultError::Sqlx(_) => {
                tracing::error!("internal error: {}", err);
                "internal server error".to_string()
            }
            VaultError::Blob(inner) => {
                tracing::warn!("blob backend error: {}", inner);
                "storage backend unavailable".to_string()
            }
            other => other.to_string(),
        };

        AppError::new(status, message)
    }
}
