// ============================================
// File: crates/ooband-client/src/lib.rs
// ============================================
//! # ooband Client
//!
//! ## Creation Reason
//! The library a scanner embeds: it registers a correlation session,
//! hands out hostnames to plant in payloads, and reads back whatever
//! reached the server.
//!
//! ## Main Functionality
//! - [`Client`]: register, mint hostnames, poll, add callbacks, close
//! - [`ClientOptions`]: server URL, persistence, timeouts, identifier variant
//! - [`SessionState`]: exported keys for resuming a persistent session
//! - [`url_reflection`]: decodes reflected payloads
//!
//! ## Usage
//! ```no_run
//! # async fn demo() -> ooband_client::Result<()> {
//! use ooband_client::{Client, ClientOptions};
//!
//! let client = Client::new(ClientOptions::new("https://oob.example.com")).await?;
//! let host = client.url();
//! // ... send `host` to the target ...
//! for interaction in client.poll().await? {
//!     println!("{} from {}", interaction.protocol, interaction.remote_address);
//! }
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Only the private key holder can read interactions; losing the
//!   client of a persistent session loses them unless `session_state`
//!   was saved
//!
//! ## Last Modified
//! v0.1.0 - Initial client

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod options;

pub use client::{Client, SessionState};
pub use error::{ClientError, Result};
pub use options::ClientOptions;

pub use ooband_core::protocol::identifier::url_reflection;
pub use ooband_core::protocol::{IdentifierVariant, Interaction, Protocol};
