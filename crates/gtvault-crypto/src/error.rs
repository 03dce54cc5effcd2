use gtvault_core::ErrorKind;
use thiserror::Error;

/// Codec and key-provider failures. None of these are transient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("plaintext must be a non-empty string")]
    InvalidInput,

    #[error("encryption key is not configured")]
    MissingEnvironmentKey,

    #[error("encryption key is invalid: {0}")]
    InvalidKey(String),

    #[error("malformed envelope: {0}")]
    MalformedData(String),

    #[error("authentication tag verification failed")]
    AuthTagVerificationFailed,

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("encryption failed")]
    EncryptionFailed,
}

impl CryptoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput => ErrorKind::InvalidInput,
            Self::MissingEnvironmentKey => ErrorKind::MissingEnvironmentKey,
            Self::InvalidKey(_) => ErrorKind::InvalidKey,
            Self::MalformedData(_) => ErrorKind::MalformedData,
            Self::AuthTagVerificationFailed => ErrorKind::AuthTagVerificationFailed,
            Self::DecryptionFailed(_) => ErrorKind::DecryptionFailed,
            Self::EncryptionFailed => ErrorKind::EncryptionFailed,
        }
    }
}
