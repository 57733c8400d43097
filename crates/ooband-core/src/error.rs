// ============================================
// File: crates/ooband-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Errors raised by the identifier codec, the wire message types and
//! the payload sealing primitives.
//!
//! ## Error Categories
//! 1. **Crypto Errors**: key parsing, sealing, opening
//! 2. **Payload Errors**: malformed sealed blobs, bad identifiers, JSON
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material or plaintext in error messages
//! - `Decryption` is deliberately opaque: wrong key and tampering look the same

use thiserror::Error;

use ooband_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for codec and cryptographic operations.
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================
    // Cryptographic Errors
    // ========================================

    /// Failed to build or parse a key.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What key was being handled
        context: String,
    },

    /// Encryption operation failed.
    #[error("Encryption failed: {context}")]
    Encryption {
        /// What was being encrypted
        context: String,
    },

    /// Decryption operation failed (authentication failure).
    #[error("Decryption failed: authentication error")]
    Decryption,

    /// Key derivation failed.
    #[error("Key derivation failed: {reason}")]
    KeyDerivation {
        /// Why derivation failed
        reason: String,
    },

    // ========================================
    // Payload Errors
    // ========================================

    /// Sealed payload is malformed or truncated.
    #[error("Malformed payload: {reason}")]
    MalformedPayload {
        /// What's wrong with the payload
        reason: String,
    },

    /// Identifier does not have the expected shape.
    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier {
        /// The offending identifier
        identifier: String,
        /// Why it was rejected
        reason: String,
    },

    /// JSON encoding or decoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `MalformedPayload` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidIdentifier` error.
    pub fn invalid_identifier(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this is a cryptographic error.
    #[must_use]
    pub const fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::KeyGeneration { .. }
                | Self::Encryption { .. }
                | Self::Decryption
                | Self::KeyDerivation { .. }
        )
    }
}
