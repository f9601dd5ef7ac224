//! Broker error types.

use crate::platform::PlatformError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Error body returned by the broker API.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub description: String,
}

/// Broker error type.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("no instance exists with ID {0}")]
    UnknownInstance(String),

    #[error("missing binding info for {0}")]
    UnknownBinding(String),

    #[error("vault contract violation: {0}")]
    Contract(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Core(#[from] porter_core::Error),

    #[error(transparent)]
    Vault(#[from] porter_vault::VaultError),
}

impl BrokerError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::UnknownInstance(_) => StatusCode::NOT_FOUND,
            Self::UnknownBinding(_) => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        // Vault error messages like to span multiple lines; the platform
        // prefixes and aggregates broker logs line by line, so flatten
        // them before they leave the adapter.
        let description = self.to_string().replace('\n', " ");
        tracing::error!("{description}");

        (self.status_code(), Json(ErrorResponse { description })).into_response()
    }
}

/// Result type for broker operations and API handlers.
pub type ApiResult<T> = std::result::Result<T, BrokerError>;
