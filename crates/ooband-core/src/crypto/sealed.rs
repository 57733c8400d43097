// ============================================
// File: crates/ooband-core/src/crypto/sealed.rs
// ============================================
//! # Sealed Payloads
//!
//! Anonymous public-key encryption of interaction records. The server
//! seals with only the client's public key; the client opens with its
//! secret.
//!
//! ## Wire Format
//! ```text
//! base64(
//!   ┌───────────────────┬─────────────┬──────────────────────────┐
//!   │ ephemeral pub (32)│ nonce (12)  │ ciphertext + tag (n + 16)│
//!   └───────────────────┴─────────────┴──────────────────────────┘
//! )
//! ```

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use super::kdf::derive_sealing_key;
use super::keys::{ClientKeyPair, ClientPublicKey, EphemeralKeyPair, SealingKey};
use super::{CHACHA20_NONCE_SIZE, POLY1305_TAG_SIZE, X25519_PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};

/// Smallest valid sealed blob (empty plaintext).
pub const MIN_SEALED_SIZE: usize = X25519_PUBLIC_KEY_SIZE + CHACHA20_NONCE_SIZE + POLY1305_TAG_SIZE;

// ============================================
// SealedPayload
// ============================================

/// A base64-encoded sealed box, as stored and as returned by `/poll`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedPayload(String);

impl SealedPayload {
    /// Wraps an already encoded blob.
    #[must_use]
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    /// Returns the base64 text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedPayload({} chars)", self.0.len())
    }
}

// ============================================
// Seal / Open
// ============================================

fn cipher(key: &SealingKey) -> ChaCha20Poly1305 {
    ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
}

/// Seals `plaintext` so that only the holder of `recipient`'s secret can read it.
///
/// # Errors
/// Returns `KeyGeneration` for a low-order recipient key and
/// `Encryption` if the AEAD fails.
pub fn seal(recipient: &ClientPublicKey, plaintext: &[u8]) -> Result<SealedPayload> {
    let ephemeral = EphemeralKeyPair::generate();
    let ephemeral_public = ephemeral.public_key_bytes();
    let mut shared = ephemeral.exchange(recipient)?;
    let key = derive_sealing_key(&shared, &ephemeral_public, recipient.as_bytes());
    zeroize::Zeroize::zeroize(&mut shared);
    let key = key?;

    let mut nonce = [0u8; CHACHA20_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher(&key)
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CoreError::Encryption {
            context: "ChaCha20-Poly1305 seal failed".into(),
        })?;

    let mut blob = Vec::with_capacity(MIN_SEALED_SIZE + plaintext.len());
    blob.extend_from_slice(&ephemeral_public);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);

    Ok(SealedPayload(BASE64.encode(blob)))
}

/// Opens a payload sealed to `keys`.
///
/// # Errors
/// - `MalformedPayload`: not base64 or shorter than [`MIN_SEALED_SIZE`]
/// - `Decryption`: wrong key or tampered payload
pub fn open(keys: &ClientKeyPair, sealed: &SealedPayload) -> Result<Vec<u8>> {
    let blob = BASE64
        .decode(sealed.as_str())
        .map_err(|e| CoreError::malformed(format!("sealed payload is not base64: {e}")))?;
    if blob.len() < MIN_SEALED_SIZE {
        return Err(CoreError::malformed(format!(
            "sealed payload too short: {} bytes",
            blob.len()
        )));
    }

    let (ephemeral_public, rest) = blob.split_at(X25519_PUBLIC_KEY_SIZE);
    let (nonce, ciphertext) = rest.split_at(CHACHA20_NONCE_SIZE);
    let ephemeral_public: [u8; X25519_PUBLIC_KEY_SIZE] = ephemeral_public
        .try_into()
        .map_err(|_| CoreError::malformed("ephemeral key truncated"))?;

    let mut shared = keys.exchange(&ephemeral_public);
    let key = derive_sealing_key(&shared, &ephemeral_public, keys.public_key().as_bytes());
    zeroize::Zeroize::zeroize(&mut shared);
    let key = key?;

    cipher(&key)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CoreError::Decryption)
}
