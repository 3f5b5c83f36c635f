//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Row-store failures. The structured kind is kept for logs; callers outside
/// the store see it only through [`AppError`] or a coarse action message.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("unknown column '{column}' for {table}")]
    UnknownColumn { table: &'static str, column: String },
    #[error("invalid id '{0}': expected a uuid")]
    InvalidId(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
}

impl StoreError {
    /// Stable code for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Constraint(_) => "constraint",
            StoreError::UnknownColumn { .. } => "unknown_column",
            StoreError::InvalidId(_) => "invalid_id",
            StoreError::Db(_) => "database",
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Store(StoreError::Db(e))
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
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Store(e) => match e {
                StoreError::Constraint(_) => (StatusCode::CONFLICT, "conflict"),
                StoreError::UnknownColumn { .. } | StoreError::InvalidId(_) => {
                    (StatusCode::BAD_REQUEST, "bad_request")
                }
                StoreError::Db(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found"),
                StoreError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
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
