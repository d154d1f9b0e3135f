//! Error types for the application kernel.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while bootstrapping or dispatching.
#[derive(Debug, Error)]
pub enum AppError {
    /// A provider named in configuration is unknown or its section is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The router produced no controller for the requested route.
    #[error("Failed to initialise controller for route '{route}'")]
    ControllerNotFound { route: String },

    /// A capability was requested that has not been bound.
    #[error("Service not bound: {0}")]
    ServiceNotBound(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("File system error: {0}")]
    FileSystem(String),

    /// Failure raised by a controller while handling the request.
    #[error("Controller error: {0}")]
    Controller(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// HTTP status associated with the error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ControllerNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Config(_)
            | Self::ServiceNotBound(_)
            | Self::Session(_)
            | Self::Database(_)
            | Self::Mail(_)
            | Self::FileSystem(_)
            | Self::Controller(_)
            | Self::Serialization(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::ControllerNotFound { .. } => "not_found",
            Self::ServiceNotBound(_) => "service_not_bound",
            Self::Session(_) => "session_error",
            Self::Database(_) => "database_error",
            Self::Mail(_) => "mail_error",
            Self::FileSystem(_) => "filesystem_error",
            Self::Controller(_) => "controller_error",
            Self::Serialization(_) => "serialization_error",
            Self::Io(_) => "io_error",
        }
    }

    /// Whether the error aborts bootstrapping rather than a single request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::ServiceNotBound(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "code": self.error_code(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
