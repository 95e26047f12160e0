use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::StatementError;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid SQL: {0}")]
    InvalidSql(String),

    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("Nothing to execute: {0}")]
    EmptyBatch(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match self {
            AppError::InvalidSql(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_SQL", msg)
                    .with_details("Check the statement syntax and submit one statement per entry."),
            ),
            AppError::UnsupportedStatement(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("UNSUPPORTED_STATEMENT", msg),
            ),
            AppError::EmptyBatch(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("EMPTY_BATCH", msg),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg),
            ),
            AppError::Engine(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("ENGINE_ERROR", msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_detail,
        });

        (status, body).into_response()
    }
}

/// Convert StatementError to AppError
impl From<StatementError> for AppError {
    fn from(err: StatementError) -> Self {
        let message = err.to_string();
        if !err.is_statement_content_error() {
            tracing::error!("Statement pipeline failure: {}", message);
        }
        match err {
            StatementError::Parse { .. } | StatementError::MultiStatement { .. } => {
                AppError::InvalidSql(message)
            }
            StatementError::UnsupportedStatementKind { .. } => AppError::UnsupportedStatement(message),
            StatementError::EmptyBatch { .. } => AppError::EmptyBatch(message),
            StatementError::Translate { .. }
            | StatementError::Execution { .. }
            | StatementError::Explain { .. }
            | StatementError::Handler { .. } => AppError::Engine(message),
        }
    }
}

/// Convert anyhow::Error to AppError
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
