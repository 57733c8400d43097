// ============================================
// File: crates/ooband-client/src/error.rs
// ============================================
//! # Client Error Types
//!
//! ## Creation Reason
//! One error type for everything the client façade can run into, from a
//! bad server URL to an interaction that will not decrypt.
//!
//! ## Error Categories
//! 1. **Setup**: `Configuration`, `Registration`
//! 2. **Session**: `Deregistration`, `Poll`, `Decryption`
//! 3. **Wrapped**: core and transport failures
//!
//! ## ⚠️ Important Note for Next Developer
//! - `Deregistration` is best-effort; callers usually log and move on

use thiserror::Error;

use ooband_core::error::CoreError;
use ooband_transport::error::TransportError;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client error types.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Options are unusable (bad URL, zero timeout).
    #[error("Invalid client configuration: {field} - {reason}")]
    Configuration {
        /// Offending option
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// The server did not accept the session.
    #[error("Registration failed: {reason}")]
    Registration {
        /// What went wrong
        reason: String,
    },

    /// The server did not drop the session.
    #[error("Deregistration failed: {reason}")]
    Deregistration {
        /// What went wrong
        reason: String,
    },

    /// A request body could not be encoded.
    #[error("Failed to encode request: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Polling did not return interactions.
    #[error("Poll failed: {reason}")]
    Poll {
        /// What went wrong
        reason: String,
    },

    /// A stored interaction could not be opened or decoded.
    #[error("Failed to decrypt interaction: {reason}")]
    Decryption {
        /// What went wrong
        reason: String,
    },

    /// Error from core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from transport crate.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Creates a `Configuration` error.
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Registration` error.
    pub fn registration(reason: impl Into<String>) -> Self {
        Self::Registration {
            reason: reason.into(),
        }
    }

    /// Creates a `Deregistration` error.
    pub fn deregistration(reason: impl Into<String>) -> Self {
        Self::Deregistration {
            reason: reason.into(),
        }
    }

    /// Creates a `Poll` error.
    pub fn poll(reason: impl Into<String>) -> Self {
        Self::Poll {
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}
