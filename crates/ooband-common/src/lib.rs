// ============================================
// File: crates/ooband-common/src/lib.rs
// ============================================
//! # ooband Common - Shared Types Library
//!
//! ## Creation Reason
//! Holds the small set of types every ooband crate agrees on: the
//! correlation identifier, the z-base-32 alphabet used to render it,
//! clock helpers and the base error type.
//!
//! ## Main Functionality
//! - [`types`]: `CorrelationId` (20-char, DNS-label safe)
//! - [`zbase32`]: z-base-32 encoder/decoder
//! - [`time`]: atomic last-activity stamps and unix clock helpers
//! - [`error`]: `CommonError` and the `Result` alias
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │      ooband-server              ooband-client        │
//! │            │                          │              │
//! │     ┌──────┴──────┐            ┌──────┘              │
//! │     ▼             ▼            ▼                     │
//! │ ooband-core   ooband-transport                       │
//! │     │             │                                  │
//! │     └──────┬──────┘                                  │
//! │            ▼                                         │
//! │      ooband-common  ◄── You are here                 │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Leaf crate: no internal dependencies
//! - The correlation ID length (20) is part of the wire contract;
//!   listeners slice identifiers by it
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;
pub mod zbase32;

pub use error::{CommonError, Result};
pub use types::{CorrelationId, CORRELATION_ID_LEN};
