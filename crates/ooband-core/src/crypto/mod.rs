// ============================================
// File: crates/ooband-core/src/crypto/mod.rs
// ============================================
//! # Cryptography Module
//!
//! ## Creation Reason
//! Interactions are stored sealed to the registering client's public key,
//! so nothing but the private-key holder can read a captured request.
//!
//! ## Main Functionality
//! - [`keys`]: client X25519 key pair, its public half, per-seal ephemeral keys
//! - [`kdf`]: HKDF-SHA256 derivation of the per-payload key
//! - [`sealed`]: anonymous sealed boxes (seal with a public key, open with the secret)
//!
//! ## Cryptographic Design
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Server (seal)                          Client (open)         │
//! │                                                               │
//! │  ephemeral X25519 ──► DH(eph, client_pub) ─┐                  │
//! │                                            ▼                  │
//! │                          HKDF-SHA256(salt, eph_pub||cli_pub)  │
//! │                                            │                  │
//! │  ChaCha20-Poly1305(key, random nonce) ◄────┘                  │
//! │                                                               │
//! │  blob = base64(eph_pub[32] || nonce[12] || ciphertext+tag)    │
//! │                                                               │
//! │                 DH(client_secret, eph_pub) ──► same key ──►   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL implementations use RustCrypto / dalek crates
//! - Secret keys implement Zeroize and never print in Debug
//! - A fresh ephemeral key per payload means nonces never repeat under one key

pub mod kdf;
pub mod keys;
pub mod sealed;

pub use keys::{ClientKeyPair, ClientPublicKey, EphemeralKeyPair, SealingKey};
pub use sealed::{open, seal, SealedPayload};

// ============================================
// Constants
// ============================================

/// Size of X25519 public key in bytes.
pub const X25519_PUBLIC_KEY_SIZE: usize = 32;

/// Size of ChaCha20-Poly1305 key in bytes.
pub const CHACHA20_KEY_SIZE: usize = 32;

/// Size of ChaCha20-Poly1305 nonce in bytes.
pub const CHACHA20_NONCE_SIZE: usize = 12;

/// Size of Poly1305 authentication tag in bytes.
pub const POLY1305_TAG_SIZE: usize = 16;

/// HKDF salt for payload key derivation.
pub const HKDF_SALT: &[u8] = b"ooband-v1";

/// HKDF info prefix for payload key derivation.
pub const HKDF_INFO_PREFIX: &[u8] = b"ooband-interaction";
