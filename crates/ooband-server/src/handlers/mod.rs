// ============================================
// File: crates/ooband-server/src/handlers/mod.rs
// ============================================
//! # Protocol Handlers
//!
//! ## Creation Reason
//! Thin protocol adapters in front of one shared capture pipeline.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`interaction`]: `Capture` → extract, callbacks, store
//! - [`dns`]: authoritative UDP responder
//! - [`smtp`]: minimal ESMTP receiver
//! - [`http`]: client API plus catch-all capture endpoint
//!
//! ## Handler Architecture
//! ```text
//! ┌──────────┐  ┌──────────┐  ┌──────────┐
//! │   DNS    │  │   SMTP   │  │   HTTP   │
//! │ (UDP)    │  │ (TCP)    │  │ (axum)   │
//! └────┬─────┘  └────┬─────┘  └────┬─────┘
//!      │ Capture     │ Capture     │ Capture
//!      └─────────────┼─────────────┘
//!                    ▼
//!          ┌───────────────────┐
//!          │ InteractionHandler│
//!          └───────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Listeners reply before anything here can fail them
//! - New protocols only need to build a `Capture`
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod dns;
pub mod http;
pub mod interaction;
pub mod smtp;

pub use dns::DnsListener;
pub use http::{router, HttpState};
pub use interaction::{Capture, InteractionHandler, Outcome};
pub use smtp::SmtpListener;
