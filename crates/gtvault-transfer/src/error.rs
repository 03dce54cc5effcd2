use gtvault_core::ErrorKind;
use thiserror::Error;

use crate::flow::TransitionError;

#[derive(Debug, Error)]
pub enum TransferError {
    /// The pipeline rejected the request; `message` is its public message.
    #[error("{kind} ({status}): {message}")]
    Remote {
        kind: ErrorKind,
        status: u16,
        message: String,
    },

    /// Client-side file check failed before anything was uploaded.
    #[error("{kind}: {message}")]
    InvalidFile { kind: ErrorKind, message: String },

    #[error("could not reach gtvault service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl TransferError {
    pub fn invalid_file(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::InvalidFile {
            kind,
            message: message.into(),
        }
    }

    /// Taxonomy kind, when the failure maps onto one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Remote { kind, .. } | Self::InvalidFile { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type TransferResult<T> = Result<T, TransferError>;
