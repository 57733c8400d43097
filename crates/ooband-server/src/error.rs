// ============================================
// File: crates/ooband-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Creation Reason
//! One error type for configuration, the session registry, the store,
//! callback evaluation and listener startup.
//!
//! ## Error Categories
//! 1. **Configuration**: load and validation failures (fatal at startup)
//! 2. **Session**: unknown correlation IDs, registry limit
//! 3. **Callback**: predicate/action failures, never fatal to a listener
//! 4. **Runtime**: storage, startup, wrapped lower-layer errors
//!
//! ## ⚠️ Important Note for Next Developer
//! - Listener code logs these; protocol replies never depend on them
//! - `status_code` is what the HTTP API answers with

use thiserror::Error;

use ooband_common::error::CommonError;
use ooband_core::error::CoreError;
use ooband_transport::error::TransportError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

// ============================================
// ServerError
// ============================================

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    // ========================================
    // Configuration Errors
    // ========================================

    /// Failed to load configuration file.
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        /// Configuration file path
        path: String,
        /// Why loading failed
        reason: String,
    },

    /// Configuration value is invalid.
    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        /// Configuration field
        field: String,
        /// Why it's invalid
        reason: String,
    },

    // ========================================
    // Session Errors
    // ========================================

    /// No session registered under the correlation ID.
    #[error("Session not found: {correlation_id}")]
    SessionNotFound {
        /// The unknown correlation ID
        correlation_id: String,
    },

    /// Registry is full.
    #[error("Session limit reached: max {limit} sessions")]
    SessionLimitReached {
        /// Configured maximum
        limit: usize,
    },

    /// An identifier was extracted but nothing is registered under it.
    #[error("No session for extracted correlation ID {correlation_id}")]
    CorrelationMiss {
        /// The extracted correlation ID
        correlation_id: String,
    },

    // ========================================
    // Callback Errors
    // ========================================

    /// A callback predicate or action failed.
    #[error("Callback #{index} failed during {stage}: {reason}")]
    Callback {
        /// Position in the session's callback list
        index: usize,
        /// `"predicate"` or `"action"`
        stage: &'static str,
        /// What went wrong
        reason: String,
    },

    /// The DSL evaluator rejected or aborted a script.
    #[error("DSL evaluation failed: {0}")]
    DslEvaluation(String),

    // ========================================
    // Runtime Errors
    // ========================================

    /// Storage operation failed.
    #[error("Storage error: {reason}")]
    Storage {
        /// What went wrong
        reason: String,
    },

    /// Server failed to start.
    #[error("Server failed to start: {reason}")]
    StartupFailed {
        /// Why startup failed
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),

    /// Error from core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Error from transport crate.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `ConfigLoad` error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `ConfigInvalid` error.
    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `SessionNotFound` error.
    pub fn session_not_found(correlation_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            correlation_id: correlation_id.into(),
        }
    }

    /// Creates a `Callback` error.
    pub fn callback(index: usize, stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Callback {
            index,
            stage,
            reason: reason.into(),
        }
    }

    /// Creates a `Storage` error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Creates a `StartupFailed` error.
    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` if the server cannot continue.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. } | Self::ConfigInvalid { .. } | Self::StartupFailed { .. }
        )
    }

    /// Returns `true` if a retry might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::SessionLimitReached { .. } => true,
            _ => false,
        }
    }

    /// HTTP status the API answers with for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionNotFound { .. } | Self::CorrelationMiss { .. } => 404,
            Self::SessionLimitReached { .. } => 503,
            Self::Common(e) if e.is_client_error() => 400,
            Self::Core(CoreError::KeyGeneration { .. } | CoreError::InvalidIdentifier { .. }) => {
                400
            }
            _ => 500,
        }
    }
}
