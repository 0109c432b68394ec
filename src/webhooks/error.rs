//! Error types for the webhook server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::config::ConfigError;

/// Per-request failures that stop a review before a verdict is reached.
///
/// These are answered with a plain-text body since no UID could be
/// recovered to build an admission response. A policy denial is not an
/// error and never appears here.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Content-Type missing or not `application/json`
    #[error("Unsupported Media Type")]
    UnsupportedMediaType,

    /// Body could not be read or is not a valid review envelope
    #[error("{0}")]
    MalformedBody(String),

    /// Envelope decoded but carries no request
    #[error("Bad Request")]
    MissingRequest,
}

impl ReviewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ReviewError::MalformedBody(_) | ReviewError::MissingRequest => StatusCode::BAD_REQUEST,
        }
    }

    /// Label value used for the rejection metric.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ReviewError::UnsupportedMediaType => "unsupported_media_type",
            ReviewError::MalformedBody(_) => "malformed_body",
            ReviewError::MissingRequest => "missing_request",
        }
    }
}

impl IntoResponse for ReviewError {
    fn into_response(self) -> Response {
        (self.status_code(), format!("{self}\n")).into_response()
    }
}

/// Errors that can occur when starting or running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// TLS key material missing or unusable
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Listener failed
    #[error("Webhook server error: {0}")]
    Server(#[from] std::io::Error),
}
