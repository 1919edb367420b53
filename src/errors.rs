//! Errors for the sighting map server
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Operation disabled: {0}")]
    OperationDisabled(String),

    #[error("Database connection error: {0}")]
    DatabaseConnectionError(String),

    #[error("Database migration error")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<QueryRejection> for MapError {
    fn from(rejection: QueryRejection) -> Self {
        MapError::InvalidParameter(rejection.body_text())
    }
}

impl MapError {
    /// HTTP status the error is surfaced with
    pub fn status(&self) -> StatusCode {
        match self {
            MapError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            MapError::OperationDisabled(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            MapError::InvalidParameter(_) => "invalid_parameter",
            MapError::OperationDisabled(_) => "operation_disabled",
            _ => "internal_error",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: &'static str,
}

impl IntoResponse for MapError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            // Source chain goes to the log only, the body carries the summary
            error!("Request failed: {:?}", self);
        }

        let body = ErrorBody {
            error: ErrorDetail {
                message: self.to_string(),
                error_type: self.kind(),
            },
        };
        (status, Json(body)).into_response()
    }
}
