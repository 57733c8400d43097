// ============================================
// File: crates/ooband-transport/src/lib.rs
// ============================================
//! # ooband Transport - Network I/O Layer
//!
//! ## Creation Reason
//! Keeps raw socket setup and outbound HTTP behind small traits so the
//! listeners and the client façade can be tested without a network.
//!
//! ## Main Functionality
//! - [`traits`]: `Transport` (datagram) and `HttpTransport` (request/response)
//! - [`udp`]: `UdpTransport`, the DNS listener socket
//! - [`tcp`]: `bind_tcp`, listening sockets for SMTP and HTTP
//! - [`http`]: `RetryingHttpClient` with exponential backoff
//! - [`error`]: `TransportError`
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │      ooband-server              ooband-client        │
//! │            │                          │              │
//! │     ┌──────┴──────┐            ┌──────┘              │
//! │     ▼             ▼            ▼                     │
//! │ ooband-core   ooband-transport ◄── You are here      │
//! │     │             │                                  │
//! │     └──────┬──────┘                                  │
//! │            ▼                                         │
//! │      ooband-common                                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Binding ports below 1024 (25, 53, 80) needs privileges
//! - Always use traits for testability
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod http;
pub mod tcp;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use http::{RetryPolicy, RetryingHttpClient};
pub use tcp::bind_tcp;
pub use traits::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, PacketSource, Transport};
pub use udp::UdpTransport;
