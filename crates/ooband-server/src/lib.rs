// ============================================
// File: crates/ooband-server/src/lib.rs
// ============================================
//! # ooband Server Library
//!
//! ## Creation Reason
//! Provides the interaction capture server: DNS, SMTP and HTTP listeners
//! that recognize correlation identifiers in inbound traffic, seal what
//! they saw to the owning client's key and hand it out on poll.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Server configuration management
//! - [`server`]: Listener orchestration and lifecycle
//! - [`services`]: Business logic services
//!   - [`services::session`]: Correlation session registry
//!   - [`services::store`]: Sealed interaction store
//!   - [`services::callbacks`]: Callback matching engine
//!   - [`services::dsl`]: Lua predicate/action evaluator
//! - [`handlers`]: Protocol listeners and the shared capture pipeline
//! - [`error`]: Server-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         ooband Server                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐    │
//! │  │   Config    │────►│   Server    │────►│    Handlers     │    │
//! │  │             │     │ Orchestrator│     │ DNS / SMTP/HTTP │    │
//! │  └─────────────┘     └──────┬──────┘     └────────┬────────┘    │
//! │                             │                     │             │
//! │         ┌───────────────────┼─────────────────────┘             │
//! │         ▼                   ▼                   ▼               │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐        │
//! │  │  Session    │     │ Correlation │     │  Callback   │        │
//! │  │  Registry   │     │    Store    │     │   Engine    │        │
//! │  └─────────────┘     └─────────────┘     └─────────────┘        │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! Target → DNS/SMTP/HTTP → extract ID → seal → store ← poll ← Client
//!                                  └──► callbacks (session found)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Default ports (53, 25, 80) need root or CAP_NET_BIND_SERVICE
//! - Configuration changes require restart (no hot-reload)
//! - State is in memory only; a restart loses sessions and interactions
//!
//! ## Last Modified
//! v0.1.0 - Initial server library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod server;
pub mod services;

// Re-export primary types
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use server::{ListenerAddrs, RunningServer, Server};
