//! gtvault-crypto: authenticated encryption for exported application state
//!
//! Envelope layout (binary, no further framing):
//! ```text
//! [12 bytes: random nonce][16 bytes: AEAD tag][N bytes: ciphertext]
//! ```
//!
//! The key is a single 256-bit secret resolved once per process from the
//! environment (base64, falling back to hex). The same key and suite are
//! required to open an envelope; anything else fails tag verification.

pub mod envelope;
pub mod error;
mod hex;
pub mod key;

pub use envelope::{decrypt, encrypt, Envelope, EnvelopeCodec};
pub use error::CryptoError;
pub use key::{generate_key, resolve_key, EnvelopeKey, KeyProvider};

/// Size of the symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM / ChaCha20-Poly1305 nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of the AEAD authentication tag
pub const TAG_SIZE: usize = 16;

/// Smallest well-formed envelope: nonce + tag, empty ciphertext
pub const HEADER_SIZE: usize = NONCE_SIZE + TAG_SIZE;
