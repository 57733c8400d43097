// ============================================
// File: crates/ooband-core/src/crypto/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Main Functionality
//! - `ClientKeyPair`: the client's long-lived X25519 secret, one per session
//! - `ClientPublicKey`: its public half, sent base64-encoded on register
//! - `EphemeralKeyPair`: single-use key the server makes for each sealed payload
//! - `SealingKey`: the derived ChaCha20-Poly1305 key
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  ClientKeyPair (per client session)                        │
//! │  ├─ Generated in Client::new                               │
//! │  ├─ Public half registered with the server                 │
//! │  └─ Secret used to open every polled payload               │
//! │                                                            │
//! │  EphemeralKeyPair (per payload)                            │
//! │  ├─ Generated by the store on put                          │
//! │  └─ Consumed by a single key exchange                      │
//! │                                                            │
//! │  SealingKey (per payload)                                  │
//! │  └─ Derived, used once, zeroed on drop                     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Secrets must never be logged; Debug impls print the public half only
//! - X25519 gives ~128-bit security, above the 2048-bit RSA bar

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{CHACHA20_KEY_SIZE, X25519_PUBLIC_KEY_SIZE};
use crate::error::{CoreError, Result};

// ============================================
// ClientKeyPair
// ============================================

/// Long-lived X25519 key pair owned by a client session.
///
/// # Example
/// ```
/// use ooband_core::crypto::ClientKeyPair;
///
/// let keys = ClientKeyPair::generate();
/// let restored = ClientKeyPair::from_bytes(&keys.to_bytes()).unwrap();
/// assert_eq!(keys.public_key(), restored.public_key());
/// ```
pub struct ClientKeyPair {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl ClientKeyPair {
    /// Generates a new key pair from the OS random number generator.
    #[must_use]
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Restores a key pair from its 32-byte secret.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if `bytes` is not 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut raw: [u8; 32] = bytes.try_into().map_err(|_| {
            CoreError::key_generation(format!(
                "invalid X25519 secret size: expected 32, got {}",
                bytes.len()
            ))
        })?;
        let secret = StaticSecret::from(raw);
        raw.zeroize();
        let public = X25519PublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    /// Exports the secret for storage.
    ///
    /// # Security Warning
    /// Persistent clients may store this; zero the returned bytes after use.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.secret.to_bytes()
    }

    /// Returns the public component.
    #[must_use]
    pub fn public_key(&self) -> ClientPublicKey {
        ClientPublicKey(self.public.to_bytes())
    }

    /// Computes the shared secret with a peer public key.
    #[must_use]
    pub(crate) fn exchange(&self, peer_public: &[u8; X25519_PUBLIC_KEY_SIZE]) -> [u8; 32] {
        let peer = X25519PublicKey::from(*peer_public);
        *self.secret.diffie_hellman(&peer).as_bytes()
    }
}

impl fmt::Debug for ClientKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientKeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

// ============================================
// ClientPublicKey
// ============================================

/// Public half of a [`ClientKeyPair`]; base64 in JSON and `Display`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientPublicKey([u8; X25519_PUBLIC_KEY_SIZE]);

impl ClientPublicKey {
    /// Wraps raw public key bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; X25519_PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw public key bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; X25519_PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Encodes the key as standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }
}

impl FromStr for ClientPublicKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = BASE64
            .decode(s.trim())
            .map_err(|e| CoreError::key_generation(format!("public key is not base64: {e}")))?;
        let raw: [u8; X25519_PUBLIC_KEY_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            CoreError::key_generation(format!(
                "invalid X25519 public key size: expected 32, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }
}

impl fmt::Debug for ClientPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClientPublicKey({:02x}{:02x}{:02x}{:02x}...)",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

impl fmt::Display for ClientPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl Serialize for ClientPublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base64())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for ClientPublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(serde::de::Error::custom)
        } else {
            let bytes = <Vec<u8>>::deserialize(deserializer)?;
            let raw: [u8; X25519_PUBLIC_KEY_SIZE] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| serde::de::Error::invalid_length(bytes.len(), &"32 bytes"))?;
            Ok(Self(raw))
        }
    }
}

// ============================================
// EphemeralKeyPair
// ============================================

/// Single-use X25519 key pair; `exchange` consumes it.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generates a new random ephemeral key pair.
    #[must_use]
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Returns the public key bytes.
    #[must_use]
    pub fn public_key_bytes(&self) -> [u8; X25519_PUBLIC_KEY_SIZE] {
        self.public.to_bytes()
    }

    /// Performs the key exchange, consuming the secret.
    ///
    /// # Errors
    /// Returns `KeyGeneration` when the peer key is a low-order point
    /// (the shared secret would be all zeros).
    pub fn exchange(self, peer_public: &ClientPublicKey) -> Result<[u8; 32]> {
        let peer = X25519PublicKey::from(*peer_public.as_bytes());
        let shared = self.secret.diffie_hellman(&peer);
        if !shared.was_contributory() {
            return Err(CoreError::key_generation("peer public key is low-order"));
        }
        Ok(*shared.as_bytes())
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.public.as_bytes();
        write!(
            f,
            "EphemeralKeyPair({:02x}{:02x}{:02x}{:02x}...)",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }
}

// ============================================
// SealingKey
// ============================================

/// Symmetric key for one sealed payload. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealingKey([u8; CHACHA20_KEY_SIZE]);

impl SealingKey {
    /// Creates a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; CHACHA20_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; CHACHA20_KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealingKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation_distinct() {
        let a = ClientKeyPair::generate();
        let b = ClientKeyPair::generate();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_keypair_rejects_wrong_size() {
        assert!(ClientKeyPair::from_bytes(&[1u8; 31]).is_err());
    }

    #[test]
    fn test_ephemeral_exchange_agrees() {
        let client = ClientKeyPair::generate();
        let eph = EphemeralKeyPair::generate();
        let eph_public = eph.public_key_bytes();

        let server_side = eph.exchange(&client.public_key()).unwrap();
        let client_side = client.exchange(&eph_public);
        assert_eq!(server_side, client_side);
    }

    #[test]
    fn test_ephemeral_rejects_low_order_point() {
        let eph = EphemeralKeyPair::generate();
        let zero = ClientPublicKey::from_bytes([0u8; 32]);
        assert!(eph.exchange(&zero).is_err());
    }

    #[test]
    fn test_public_key_base64_serde() {
        let public = ClientKeyPair::generate().public_key();
        let json = serde_json::to_string(&public).unwrap();
        assert_eq!(json, format!("\"{}\"", public.to_base64()));

        let restored: ClientPublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, public);
    }

    #[test]
    fn test_public_key_parse_errors() {
        assert!("not base64!".parse::<ClientPublicKey>().is_err());
        assert!(BASE64.encode([1u8; 16]).parse::<ClientPublicKey>().is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let keys = ClientKeyPair::generate();
        assert!(format!("{keys:?}").contains("ClientPublicKey"));
        let key = SealingKey::from_bytes([0x42; 32]);
        assert_eq!(format!("{key:?}"), "SealingKey([REDACTED])");
    }
}
