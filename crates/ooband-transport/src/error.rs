// ============================================
// File: crates/ooband-transport/src/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Error Categories
//! 1. **Socket Errors**: bind, send, receive failures on listener sockets
//! 2. **HTTP Errors**: request failures and non-success statuses from the
//!    retrying client
//! 3. **System Errors**: I/O and shutdown
//!
//! ## ⚠️ Important Note for Next Developer
//! - `is_retryable` drives `RetryingHttpClient`; keep it in sync with the
//!   backoff policy (network errors and 5xx only)

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use ooband_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

// ============================================
// TransportError
// ============================================

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    // ========================================
    // Socket Errors
    // ========================================

    /// Failed to bind to address.
    #[error("Failed to bind to {addr}: {reason}")]
    BindFailed {
        /// Address we tried to bind to
        addr: SocketAddr,
        /// Why binding failed
        reason: String,
    },

    /// Address already in use.
    #[error("Address {addr} already in use")]
    AddressInUse {
        /// The address that's in use
        addr: SocketAddr,
    },

    /// Send operation failed.
    #[error("Failed to send to {dest}: {reason}")]
    SendFailed {
        /// Destination address
        dest: SocketAddr,
        /// Why send failed
        reason: String,
    },

    /// Receive operation failed.
    #[error("Failed to receive: {reason}")]
    ReceiveFailed {
        /// Why receive failed
        reason: String,
    },

    /// Address could not be parsed.
    #[error("Invalid address: {addr}")]
    InvalidAddress {
        /// The invalid address string
        addr: String,
    },

    // ========================================
    // HTTP Errors
    // ========================================

    /// The HTTP request could not be completed.
    #[error("Request to {url} failed: {reason}")]
    Request {
        /// Target URL
        url: String,
        /// Why it failed
        reason: String,
        /// Whether the failure was a connect/timeout class error
        transient: bool,
    },

    /// The server answered with an unexpected status.
    #[error("Request to {url} returned status {status}")]
    Status {
        /// Target URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, for diagnostics
        body: String,
    },

    // ========================================
    // System Errors
    // ========================================

    /// Transport is shutting down.
    #[error("Transport is shutting down")]
    ShuttingDown,

    /// I/O error from the system.
    #[error("I/O error: {context}")]
    Io {
        /// What was happening when the error occurred
        context: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl TransportError {
    /// Creates a `BindFailed` error.
    pub fn bind_failed(addr: SocketAddr, reason: impl Into<String>) -> Self {
        Self::BindFailed {
            addr,
            reason: reason.into(),
        }
    }

    /// Creates an `Io` error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Maps a bind-time `io::Error`, singling out `AddrInUse`.
    #[must_use]
    pub fn from_bind(addr: SocketAddr, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::AddrInUse {
            Self::AddressInUse { addr }
        } else {
            Self::bind_failed(addr, err.to_string())
        }
    }

    /// HTTP status carried by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this error is transient and retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request { transient, .. } => *transient,
            Self::Status { status, .. } => *status >= 500,
            Self::Io { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
            ),
            Self::SendFailed { .. } | Self::ReceiveFailed { .. } => true,
            _ => false,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        Self::Io {
            context: "unspecified I/O operation".into(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::bind_failed("127.0.0.1:25".parse().unwrap(), "denied");
        assert!(err.to_string().contains("127.0.0.1:25"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_status_retry_classification() {
        let server_side = TransportError::Status {
            url: "http://oob/register".into(),
            status: 503,
            body: String::new(),
        };
        assert!(server_side.is_retryable());
        assert_eq!(server_side.status(), Some(503));

        let client_side = TransportError::Status {
            url: "http://oob/register".into(),
            status: 400,
            body: String::new(),
        };
        assert!(!client_side.is_retryable());
    }

    #[test]
    fn test_request_retry_classification() {
        let transient = TransportError::Request {
            url: "http://oob".into(),
            reason: "connection refused".into(),
            transient: true,
        };
        assert!(transient.is_retryable());

        let permanent = TransportError::Request {
            url: "http://oob".into(),
            reason: "builder error".into(),
            transient: false,
        };
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn test_bind_error_mapping() {
        let addr: SocketAddr = "0.0.0.0:53".parse().unwrap();
        let in_use = io::Error::new(io::ErrorKind::AddrInUse, "in use");
        assert!(matches!(
            TransportError::from_bind(addr, &in_use),
            TransportError::AddressInUse { .. }
        ));

        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(
            TransportError::from_bind(addr, &denied),
            TransportError::BindFailed { .. }
        ));
    }
}
