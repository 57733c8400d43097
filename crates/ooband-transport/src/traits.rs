// ============================================
// File: crates/ooband-transport/src/traits.rs
// ============================================
//! # Transport Traits
//!
//! ## Main Functionality
//! - `Transport`: datagram socket used by the DNS listener
//! - `HttpTransport`: request/response channel used by the client façade
//! - `PacketSource`: where a datagram came from
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both traits are object safe; listeners and the client hold them as
//!   `Arc<dyn …>` so tests can substitute in-memory fakes

use std::fmt;
use std::net::SocketAddr;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::Result;

// ============================================
// PacketSource
// ============================================

/// Origin of a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketSource {
    /// Source address (IP and port).
    pub addr: SocketAddr,
    /// When the datagram was received.
    pub timestamp: Instant,
}

impl PacketSource {
    /// Creates a `PacketSource` stamped now.
    #[must_use]
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            timestamp: Instant::now(),
        }
    }
}

// ============================================
// Transport (datagram)
// ============================================

/// Datagram transport.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Receives one datagram into `buf`.
    ///
    /// # Errors
    /// Returns error if receive fails or the transport is shut down.
    async fn recv(&self, buf: &mut [u8]) -> Result<(usize, PacketSource)>;

    /// Sends one datagram to `dest`.
    ///
    /// # Errors
    /// Returns error if send fails or the transport is shut down.
    async fn send(&self, buf: &[u8], dest: &SocketAddr) -> Result<usize>;

    /// Returns the local address this transport is bound to.
    ///
    /// # Errors
    /// Returns error if address cannot be determined.
    fn local_addr(&self) -> Result<SocketAddr>;

    /// Marks the transport closed; later operations fail.
    ///
    /// # Errors
    /// Returns error if shutdown fails.
    async fn shutdown(&self) -> Result<()>;

    /// Returns `true` if the transport is still active.
    fn is_active(&self) -> bool;
}

// ============================================
// HttpTransport
// ============================================

/// HTTP method subset the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// An outgoing request; bodies are JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Method.
    pub method: HttpMethod,
    /// Absolute URL, query string included.
    pub url: String,
    /// JSON body, if any.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// `GET url`
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: None,
        }
    }

    /// `POST url` with a JSON body.
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Body as lossy UTF-8, for error messages.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Request/response transport with its own retry and timeout policy.
///
/// Implementations return `Ok` for any status the server produced once
/// retries are exhausted; callers decide what a non-200 means.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes `request`.
    ///
    /// # Errors
    /// Returns `Request` when no response could be obtained.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let get = HttpRequest::get("http://oob/poll?id=x");
        assert_eq!(get.method, HttpMethod::Get);
        assert!(get.body.is_none());

        let post = HttpRequest::post_json("http://oob/register", b"{}".to_vec());
        assert_eq!(post.method.to_string(), "POST");
        assert_eq!(post.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_response_success_range() {
        let ok = HttpResponse { status: 200, body: Vec::new() };
        let created = HttpResponse { status: 204, body: Vec::new() };
        let missing = HttpResponse { status: 404, body: b"gone".to_vec() };
        assert!(ok.is_success());
        assert!(created.is_success());
        assert!(!missing.is_success());
        assert_eq!(missing.text(), "gone");
    }
}
