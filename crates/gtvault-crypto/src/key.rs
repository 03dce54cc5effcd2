//! Envelope key: resolution from configuration, provisioning, fingerprints

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use gtvault_core::config::CryptoConfig;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::{hex, KEY_SIZE};

/// The process-wide 256-bit envelope key. Zeroized on drop.
#[derive(Clone)]
pub struct EnvelopeKey {
    bytes: [u8; KEY_SIZE],
}

impl EnvelopeKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Short non-secret identifier (first 8 hex chars of BLAKE3 over the key).
    ///
    /// Safe to log; two deployments that can read each other's files print
    /// the same fingerprint.
    pub fn fingerprint(&self) -> String {
        blake3::hash(&self.bytes).to_hex().as_str()[..8].to_string()
    }
}

impl Drop for EnvelopeKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Names the environment variable the key is read from.
///
/// Resolved once at startup; the resulting [`EnvelopeKey`] is handed to the
/// request pipeline and never re-read per request.
#[derive(Debug, Clone)]
pub struct KeyProvider {
    env_var: String,
}

impl KeyProvider {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    pub fn from_config(config: &CryptoConfig) -> Self {
        Self::new(config.key_env.clone())
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Read and decode the key from the environment.
    pub fn resolve(&self) -> Result<EnvelopeKey, CryptoError> {
        tracing::debug!(env_var = %self.env_var, "resolving envelope key");
        match std::env::var(&self.env_var) {
            Ok(value) => resolve_key(Some(&SecretString::from(value))),
            Err(std::env::VarError::NotPresent) => resolve_key(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(CryptoError::InvalidKey(format!(
                "{} is not valid unicode",
                self.env_var
            ))),
        }
    }
}

/// Decode a configured key value: base64 first, hex if base64 does not
/// yield exactly 32 bytes.
///
/// Absent or blank values are `MissingEnvironmentKey`; anything that decodes
/// to the wrong length, or not at all, is `InvalidKey`.
pub fn resolve_key(value: Option<&SecretString>) -> Result<EnvelopeKey, CryptoError> {
    let raw = match value {
        Some(v) if !v.expose_secret().trim().is_empty() => v.expose_secret().trim(),
        _ => return Err(CryptoError::MissingEnvironmentKey),
    };

    if let Some(key) = decode_base64_key(raw) {
        return Ok(key);
    }

    match hex::decode(raw) {
        Ok(mut bytes) => {
            let key = key_from_vec(&bytes);
            bytes.zeroize();
            key.ok_or_else(|| {
                CryptoError::InvalidKey(format!("expected {KEY_SIZE} bytes after decoding"))
            })
        }
        Err(_) => Err(CryptoError::InvalidKey(
            "value is neither base64 nor hex".to_string(),
        )),
    }
}

/// Generate a fresh random key, base64-encoded, for provisioning.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    let encoded = STANDARD.encode(bytes);
    bytes.zeroize();
    encoded
}

fn decode_base64_key(raw: &str) -> Option<EnvelopeKey> {
    for engine in [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD] {
        if let Ok(mut bytes) = engine.decode(raw) {
            let key = key_from_vec(&bytes);
            bytes.zeroize();
            if key.is_some() {
                return key;
            }
        }
    }
    None
}

fn key_from_vec(bytes: &[u8]) -> Option<EnvelopeKey> {
    if bytes.len() != KEY_SIZE {
        return None;
    }
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(bytes);
    Some(EnvelopeKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn hex_encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn test_generate_key_decodes_to_32_bytes() {
        let encoded = generate_key();
        let decoded = STANDARD.decode(&encoded).unwrap();
        assert_eq!(decoded.len(), KEY_SIZE);
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_key(), generate_key(), "random keys must differ");
    }

    #[test]
    fn test_resolve_base64() {
        let encoded = STANDARD.encode([7u8; KEY_SIZE]);
        let key = resolve_key(Some(&secret(&encoded))).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; KEY_SIZE]);
    }

    #[test]
    fn test_resolve_base64_surrounding_whitespace() {
        let encoded = format!("  {}\n", STANDARD.encode([9u8; KEY_SIZE]));
        let key = resolve_key(Some(&secret(&encoded))).unwrap();
        assert_eq!(key.as_bytes(), &[9u8; KEY_SIZE]);
    }

    #[test]
    fn test_resolve_hex_fallback() {
        // 64 hex chars are also valid base64, but decode to 48 bytes there
        let encoded = hex_encode(&[0xABu8; KEY_SIZE]);
        let key = resolve_key(Some(&secret(&encoded))).unwrap();
        assert_eq!(key.as_bytes(), &[0xABu8; KEY_SIZE]);
    }

    #[test]
    fn test_resolve_missing() {
        assert_eq!(resolve_key(None).unwrap_err(), CryptoError::MissingEnvironmentKey);
        assert_eq!(
            resolve_key(Some(&secret("   "))).unwrap_err(),
            CryptoError::MissingEnvironmentKey
        );
    }

    #[test]
    fn test_resolve_wrong_length() {
        let short = STANDARD.encode([1u8; 16]);
        let err = resolve_key(Some(&secret(&short))).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));

        let short_hex = hex_encode(&[1u8; 31]);
        let err = resolve_key(Some(&secret(&short_hex))).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_resolve_garbage() {
        let err = resolve_key(Some(&secret("not a key!"))).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[test]
    fn test_provider_reads_named_variable() {
        let var = "GTVAULT_TEST_KEY_PROVIDER_READS";
        std::env::set_var(var, STANDARD.encode([3u8; KEY_SIZE]));
        let key = KeyProvider::new(var).resolve().unwrap();
        assert_eq!(key.as_bytes(), &[3u8; KEY_SIZE]);
        std::env::remove_var(var);
    }

    #[test]
    fn test_provider_unset_variable() {
        let provider = KeyProvider::new("GTVAULT_TEST_KEY_PROVIDER_UNSET");
        assert_eq!(provider.resolve().unwrap_err(), CryptoError::MissingEnvironmentKey);
    }

    #[test]
    fn test_debug_redacts() {
        let key = EnvelopeKey::from_bytes([0x42u8; KEY_SIZE]);
        let debug = format!("{key:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("42"));
    }

    #[test]
    fn test_fingerprint_stable_and_distinct() {
        let a = EnvelopeKey::from_bytes([1u8; KEY_SIZE]);
        let b = EnvelopeKey::from_bytes([2u8; KEY_SIZE]);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_eq!(a.fingerprint().len(), 8);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
