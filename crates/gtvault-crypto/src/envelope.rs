//! Envelope sealing and opening
//!
//! Envelope format (binary):
//! ```text
//! [12 bytes: random nonce][16 bytes: tag][N bytes: ciphertext]
//! ```
//!
//! The tag is computed detached and stored ahead of the ciphertext so the
//! header has a fixed size. Optional AAD is authenticated but not stored;
//! the same AAD must be supplied to open the envelope.

use std::sync::Arc;

use aes_gcm::aead::consts::{U12, U16};
use aes_gcm::aead::{self, AeadCore, AeadInPlace, KeyInit};
use aes_gcm::Aes256Gcm;
use chacha20poly1305::ChaCha20Poly1305;
use gtvault_core::CipherSuite;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::key::EnvelopeKey;
use crate::{HEADER_SIZE, NONCE_SIZE, TAG_SIZE};

/// A sealed payload split into its fixed-layout components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    nonce: [u8; NONCE_SIZE],
    tag: [u8; TAG_SIZE],
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    pub fn tag(&self) -> &[u8; TAG_SIZE] {
        &self.tag
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Size of the serialized envelope in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.ciphertext.len()
    }

    /// Serialize as `nonce || tag || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Split raw bytes into components. Does not authenticate anything.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CryptoError::MalformedData(format!(
                "envelope too short: {} bytes (minimum {HEADER_SIZE})",
                bytes.len()
            )));
        }

        let (nonce_bytes, rest) = bytes.split_at(NONCE_SIZE);
        let (tag_bytes, ciphertext) = rest.split_at(TAG_SIZE);

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(tag_bytes);

        Ok(Self {
            nonce,
            tag,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt a non-empty UTF-8 string under a fresh random nonce.
///
/// Two calls with identical inputs produce different envelopes.
pub fn encrypt(
    key: &EnvelopeKey,
    suite: CipherSuite,
    plaintext: &str,
    aad: Option<&[u8]>,
) -> Result<Envelope, CryptoError> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    encrypt_with_nonce(key, suite, nonce, plaintext, aad)
}

pub(crate) fn encrypt_with_nonce(
    key: &EnvelopeKey,
    suite: CipherSuite,
    nonce: [u8; NONCE_SIZE],
    plaintext: &str,
    aad: Option<&[u8]>,
) -> Result<Envelope, CryptoError> {
    if plaintext.is_empty() {
        return Err(CryptoError::InvalidInput);
    }

    let aad = aad.unwrap_or_default();
    let mut buffer = plaintext.as_bytes().to_vec();

    let tag = match suite {
        CipherSuite::Aes256Gcm => seal_in_place::<Aes256Gcm>(key, &nonce, aad, &mut buffer),
        CipherSuite::ChaCha20Poly1305 => {
            seal_in_place::<ChaCha20Poly1305>(key, &nonce, aad, &mut buffer)
        }
    };

    match tag {
        Ok(tag) => Ok(Envelope {
            nonce,
            tag,
            ciphertext: buffer,
        }),
        Err(e) => {
            buffer.zeroize();
            Err(e)
        }
    }
}

/// Authenticate and decrypt an envelope back into its UTF-8 plaintext.
///
/// The tag is verified before any plaintext is released; on failure the
/// working buffer is wiped and nothing is returned.
pub fn decrypt(
    key: &EnvelopeKey,
    suite: CipherSuite,
    envelope: &[u8],
    aad: Option<&[u8]>,
) -> Result<String, CryptoError> {
    let Envelope {
        nonce,
        tag,
        ciphertext,
    } = Envelope::from_bytes(envelope)?;

    let aad = aad.unwrap_or_default();
    let mut buffer = ciphertext;

    let opened = match suite {
        CipherSuite::Aes256Gcm => open_in_place::<Aes256Gcm>(key, &nonce, &tag, aad, &mut buffer),
        CipherSuite::ChaCha20Poly1305 => {
            open_in_place::<ChaCha20Poly1305>(key, &nonce, &tag, aad, &mut buffer)
        }
    };
    if let Err(e) = opened {
        buffer.zeroize();
        return Err(e);
    }

    String::from_utf8(buffer).map_err(|e| {
        let mut bytes = e.into_bytes();
        bytes.zeroize();
        CryptoError::DecryptionFailed("plaintext is not valid UTF-8".to_string())
    })
}

fn seal_in_place<C>(
    key: &EnvelopeKey,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    buffer: &mut [u8],
) -> Result<[u8; TAG_SIZE], CryptoError>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::InvalidKey("cipher rejected key length".to_string()))?;

    let tag = cipher
        .encrypt_in_place_detached(aead::Nonce::<C>::from_slice(nonce), aad, buffer)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = [0u8; TAG_SIZE];
    out.copy_from_slice(tag.as_slice());
    Ok(out)
}

fn open_in_place<C>(
    key: &EnvelopeKey,
    nonce: &[u8; NONCE_SIZE],
    tag: &[u8; TAG_SIZE],
    aad: &[u8],
    buffer: &mut [u8],
) -> Result<(), CryptoError>
where
    C: KeyInit + AeadInPlace + AeadCore<NonceSize = U12, TagSize = U16>,
{
    let cipher = C::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::InvalidKey("cipher rejected key length".to_string()))?;

    cipher
        .decrypt_in_place_detached(
            aead::Nonce::<C>::from_slice(nonce),
            aad,
            buffer,
            aead::Tag::<C>::from_slice(tag),
        )
        .map_err(|_| CryptoError::AuthTagVerificationFailed)
}

/// Key and suite bound together, shared across concurrent requests.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    key: Arc<EnvelopeKey>,
    suite: CipherSuite,
}

impl EnvelopeCodec {
    pub fn new(key: Arc<EnvelopeKey>, suite: CipherSuite) -> Self {
        Self { key, suite }
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    pub fn key_fingerprint(&self) -> String {
        self.key.fingerprint()
    }

    pub fn encrypt(&self, plaintext: &str, aad: Option<&[u8]>) -> Result<Envelope, CryptoError> {
        encrypt(&self.key, self.suite, plaintext, aad)
    }

    pub fn decrypt(&self, envelope: &[u8], aad: Option<&[u8]>) -> Result<String, CryptoError> {
        decrypt(&self.key, self.suite, envelope, aad)
    }
}
