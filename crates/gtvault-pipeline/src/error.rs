//! Pipeline error: taxonomy kind + public message + optional diagnostics

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use gtvault_core::{config::Environment, naming::iso_timestamp, ErrorBody, ErrorKind};
use gtvault_crypto::CryptoError;
use thiserror::Error;

/// A rejected request.
///
/// `message` is always safe to show to a client; `details` carries internal
/// diagnostics and is only rendered in development mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn payload_too_large(size: usize, limit: usize) -> Self {
        Self::new(
            ErrorKind::PayloadTooLarge,
            format!("Payload too large: {size} bytes exceeds the {limit} byte limit"),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }

    pub fn status(&self) -> StatusCode {
        status_for(self.kind)
    }

    /// Render the JSON error body, dropping `details` outside development.
    pub fn to_body(&self, environment: Environment) -> ErrorBody {
        ErrorBody {
            error: self.kind,
            message: self.message.clone(),
            timestamp: iso_timestamp(Utc::now()),
            details: if environment.is_development() {
                self.details.clone()
            } else {
                None
            },
        }
    }

    pub fn into_response_for(self, environment: Environment) -> Response {
        (self.status(), Json(self.to_body(environment))).into_response()
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        self.into_response_for(Environment::Production)
    }
}

impl From<CryptoError> for PipelineError {
    fn from(err: CryptoError) -> Self {
        let message = match &err {
            CryptoError::InvalidInput => "Data to encrypt must not be empty",
            CryptoError::MissingEnvironmentKey | CryptoError::InvalidKey(_) => {
                "Server encryption is not configured correctly"
            }
            CryptoError::MalformedData(_) => "Invalid encrypted data format",
            CryptoError::AuthTagVerificationFailed => {
                "Data integrity check failed: the file is corrupted or was created with a different key"
            }
            CryptoError::DecryptionFailed(_) => "Failed to decrypt data",
            CryptoError::EncryptionFailed => "Failed to encrypt data",
        };
        Self::new(err.kind(), message).with_details(err.to_string())
    }
}

/// HTTP status for each taxonomy kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::MalformedData
        | ErrorKind::AuthTagVerificationFailed
        | ErrorKind::DecryptionFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Timeout => StatusCode::REQUEST_TIMEOUT,
        ErrorKind::MissingEnvironmentKey
        | ErrorKind::InvalidKey
        | ErrorKind::EncryptionFailed
        | ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
