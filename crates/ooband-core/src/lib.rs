// ============================================
// File: crates/ooband-core/src/lib.rs
// ============================================
//! # ooband Core - Identifier & Sealing Library
//!
//! ## Creation Reason
//! Everything the client and the server must agree on byte-for-byte:
//! how identifier labels are built and parsed, what the API messages
//! look like, and how interaction records are sealed.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - Identifier minting/extraction and payload reflection
//! - `Interaction` record
//! - Register/deregister/poll/callback message bodies
//!
//! ### Crypto Module ([`crypto`])
//! - `ClientKeyPair` / `ClientPublicKey` (X25519)
//! - Sealed boxes: X25519 + HKDF-SHA256 + ChaCha20-Poly1305
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │      ooband-server              ooband-client        │
//! │            │                          │              │
//! │     ┌──────┴──────┐            ┌──────┘              │
//! │     ▼             ▼            ▼                     │
//! │ ooband-core ◄── You are here                         │
//! │     │         ooband-transport                       │
//! │     └──────┬──────┘                                  │
//! │            ▼                                         │
//! │      ooband-common                                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Crypto comes from audited RustCrypto / dalek crates only
//! - Changing the sealed wire format breaks every deployed client
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crypto;
pub mod error;
pub mod protocol;

pub use crypto::{ClientKeyPair, ClientPublicKey, SealedPayload};
pub use error::{CoreError, Result};
pub use protocol::{Callback, IdentifierVariant, Interaction, Protocol};
