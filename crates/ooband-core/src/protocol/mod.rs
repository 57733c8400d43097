// ============================================
// File: crates/ooband-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Main Functionality
//! - [`identifier`]: minting and extraction of identifier labels
//! - [`interaction`]: the captured interaction record
//! - [`messages`]: JSON bodies of the register/poll/deregister API
//!
//! ## Protocol Overview
//! ```text
//! Client ── POST /register {correlation-id, public-key} ──► Server
//! Client ── plants <identifier>.<domain> via DNS/HTTP/SMTP ──► Listeners
//! Client ── GET /poll?id=… ◄── sealed Interaction JSON ────── Server
//! Client ── POST /deregister {correlation-id} ─────────────► Server
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Field names are part of the public API; keep them kebab-case

pub mod identifier;
pub mod interaction;
pub mod messages;

pub use identifier::{
    extract_from_recipients, extract_identifier, mint, url_reflection, ExtractedIdentifier,
    IdentifierVariant,
};
pub use interaction::{Interaction, Protocol};
pub use messages::{
    Callback, CallbackRequest, DeregisterRequest, ErrorResponse, MessageResponse, PollQuery,
    PollResponse, RegisterRequest,
};
