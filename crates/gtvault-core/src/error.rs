use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type GtvaultResult<T> = Result<T, GtvaultError>;

#[derive(Debug, Error)]
pub enum GtvaultError {
    #[error("config error: {0}")]
    Config(String),
}

/// Error taxonomy shared by the codec, the request pipeline, and the
/// transfer client. Serialized as `SCREAMING_SNAKE_CASE` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Request shape or content type wrong, or JSON unparsable.
    InvalidInput,
    /// Plaintext or envelope exceeds the payload ceiling.
    PayloadTooLarge,
    /// Envelope shorter than the fixed header, or decrypted bytes aren't JSON.
    MalformedData,
    /// Tag check failed: corruption, tampering, wrong key, or AAD mismatch.
    AuthTagVerificationFailed,
    /// Decryption-path failure not otherwise classified.
    DecryptionFailed,
    /// AEAD encryption itself failed.
    EncryptionFailed,
    /// The key configuration value is absent.
    MissingEnvironmentKey,
    /// The key configuration value does not decode to 32 bytes.
    InvalidKey,
    /// The soft processing deadline was exceeded before the codec ran.
    Timeout,
    /// Unclassified failure caught at the outermost boundary.
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::MalformedData => "MALFORMED_DATA",
            Self::AuthTagVerificationFailed => "AUTH_TAG_VERIFICATION_FAILED",
            Self::DecryptionFailed => "DECRYPTION_FAILED",
            Self::EncryptionFailed => "ENCRYPTION_FAILED",
            Self::MissingEnvironmentKey => "MISSING_ENVIRONMENT_KEY",
            Self::InvalidKey => "INVALID_KEY",
            Self::Timeout => "TIMEOUT",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Configuration problems on the serving side, as opposed to bad input.
    pub fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::MissingEnvironmentKey
                | Self::InvalidKey
                | Self::EncryptionFailed
                | Self::InternalError
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
