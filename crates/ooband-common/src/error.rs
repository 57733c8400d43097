// ============================================
// File: crates/ooband-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Base error type for the validation and encoding failures that every
//! ooband crate can hit, so crate-specific errors can wrap one type.
//!
//! ## Main Functionality
//! - `CommonError`: validation, lookup and encoding failures
//! - `Result<T>`: alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never put key material or decrypted payloads into error messages
//! - Correlation IDs are fine to include: they are public by nature

use thiserror::Error;

// ============================================
// Result Type Alias
// ============================================

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

// ============================================
// CommonError
// ============================================

/// Errors shared across ooband crates.
///
/// # Example
/// ```
/// use ooband_common::error::{CommonError, Result};
///
/// fn require_label(label: &str) -> Result<()> {
///     if label.is_empty() {
///         return Err(CommonError::invalid_input("label", "cannot be empty"));
///     }
///     Ok(())
/// }
/// assert!(require_label("").is_err());
/// ```
#[derive(Error, Debug)]
pub enum CommonError {
    // ========================================
    // Validation Errors
    // ========================================

    /// Invalid input data provided.
    #[error("Invalid input for '{field}': {reason}")]
    InvalidInput {
        /// Name of the field or parameter
        field: String,
        /// Description of what's wrong
        reason: String,
    },

    /// Data length doesn't match expected size.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    // ========================================
    // Resource Errors
    // ========================================

    /// Requested resource was not found.
    #[error("Resource not found: {resource_type} with id '{id}'")]
    NotFound {
        /// Type of resource (e.g., "session")
        resource_type: String,
        /// Identifier that wasn't found
        id: String,
    },

    // ========================================
    // Encoding Errors
    // ========================================

    /// Failed to encode/serialize data.
    #[error("Encoding error: {context}: {details}")]
    Encoding {
        /// What was being encoded
        context: String,
        /// Error details
        details: String,
    },

    /// Failed to decode/deserialize data.
    #[error("Decoding error: {context}: {details}")]
    Decoding {
        /// What was being decoded
        context: String,
        /// Error details
        details: String,
    },

    // ========================================
    // Internal Errors
    // ========================================

    /// Internal error (bug or unexpected condition).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong
        message: String,
    },
}

impl CommonError {
    /// Creates an `InvalidInput` error.
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Creates an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error was caused by caller-supplied data.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::InvalidLength { .. }
                | Self::NotFound { .. }
                | Self::Decoding { .. }
        )
    }
}

impl From<base64::DecodeError> for CommonError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Decoding {
            context: "base64".into(),
            details: err.to_string(),
        }
    }
}
