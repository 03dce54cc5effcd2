//! User-facing progress and failure text for save/load.

use gtvault_core::ErrorKind;

use crate::error::TransferError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransferStatus {
    #[default]
    Idle,
    Loading,
    Success(String),
    Error(String),
}

/// Human sentence for a failed load, keyed by the pipeline's error kind.
pub fn user_message(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::PayloadTooLarge => "File is too large",
        ErrorKind::MalformedData
        | ErrorKind::AuthTagVerificationFailed
        | ErrorKind::DecryptionFailed => "File appears to be corrupted or invalid",
        ErrorKind::InvalidInput => "Invalid file. Please select a .gt export",
        ErrorKind::Timeout => "The request took too long. Please try again",
        ErrorKind::MissingEnvironmentKey
        | ErrorKind::InvalidKey
        | ErrorKind::EncryptionFailed
        | ErrorKind::InternalError => "Server error. Please try again later",
    }
}

/// Message shown when a save fails. Pipeline messages pass through verbatim.
pub fn save_failure_message(err: &TransferError) -> String {
    match err {
        TransferError::Remote { message, .. } | TransferError::InvalidFile { message, .. } => {
            message.clone()
        }
        TransferError::Transport(_) => "Could not reach the gtvault service".into(),
        other => format!("Failed to save state: {other}"),
    }
}

/// Message shown when a load fails.
pub fn load_failure_message(err: &TransferError) -> String {
    match err {
        TransferError::InvalidFile { message, .. } => message.clone(),
        TransferError::Remote { kind, .. } => user_message(*kind).into(),
        TransferError::Transport(_) => "Could not reach the gtvault service".into(),
        other => format!("Failed to load state: {other}"),
    }
}
