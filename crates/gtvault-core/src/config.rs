use serde::{Deserialize, Serialize};

use crate::error::{GtvaultError, GtvaultResult};
use crate::types::CipherSuite;

/// Top-level configuration (loaded from gtvault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GtvaultConfig {
    pub server: ServerConfig,
    pub crypto: CryptoConfig,
    pub limits: LimitsConfig,
    pub transfer: TransferConfig,
}

impl GtvaultConfig {
    /// Reject values that would make the pipeline refuse every request.
    pub fn validate(&self) -> GtvaultResult<()> {
        if self.limits.max_payload_bytes == 0 {
            return Err(GtvaultError::Config(
                "limits.max_payload_bytes must be greater than zero".into(),
            ));
        }
        if self.limits.request_budget_ms == 0 {
            return Err(GtvaultError::Config(
                "limits.request_budget_ms must be greater than zero".into(),
            ));
        }
        if !(self.limits.abort_ratio > 0.0 && self.limits.abort_ratio <= 1.0) {
            return Err(GtvaultError::Config(format!(
                "limits.abort_ratio must be in (0, 1], got {}",
                self.limits.abort_ratio
            )));
        }
        if self.crypto.key_env.trim().is_empty() {
            return Err(GtvaultError::Config("crypto.key_env must name a variable".into()));
        }
        if self.transfer.file_extension.trim_start_matches('.').is_empty() {
            return Err(GtvaultError::Config(
                "transfer.file_extension must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Whether error responses may carry diagnostic detail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP listen address for the encrypt/decrypt API
    pub listen: String,
    /// Prometheus metrics endpoint (optional, separate listener)
    pub metrics_addr: Option<String>,
    /// Log level (default: info)
    pub log_level: String,
    /// Log format: "json" or "text"
    pub log_format: String,
    /// "development" exposes error details in responses
    pub environment: Environment,
}

/// Envelope key and cipher selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Environment variable holding the base64 or hex encoded 32-byte key.
    /// The key itself never lives in the config file.
    pub key_env: String,
    /// AEAD suite (default: aes-256-gcm)
    pub cipher: CipherSuite,
}

/// Request ceilings enforced before the codec runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum plaintext or envelope size in bytes (default: 200 KiB)
    pub max_payload_bytes: usize,
    /// Per-request wall-clock budget in milliseconds (default: 3000)
    pub request_budget_ms: u64,
    /// Fraction of the budget after which requests are abandoned (default: 0.8)
    pub abort_ratio: f64,
}

/// Client-side save/load settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Base URL of the gtvaultd API
    pub endpoint: String,
    /// Export filename prefix
    pub file_base: String,
    /// Export filename extension, without the dot
    pub file_extension: String,
    /// Version string attached to saved snapshots
    pub state_version: String,
    /// HTTP timeout for a single save/load call in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8787".into(),
            metrics_addr: Some("127.0.0.1:9187".into()),
            log_level: "info".into(),
            log_format: "json".into(),
            environment: Environment::Production,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            key_env: "GTVAULT_ENCRYPTION_KEY".into(),
            cipher: CipherSuite::Aes256Gcm,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 200 * 1024,
            request_budget_ms: 3000,
            abort_ratio: 0.8,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787".into(),
            file_base: "gtvault-state".into(),
            file_extension: "gt".into(),
            state_version: env!("CARGO_PKG_VERSION").into(),
            request_timeout_ms: 10_000,
        }
    }
}
