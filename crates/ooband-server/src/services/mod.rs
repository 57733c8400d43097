// ============================================
// File: crates/ooband-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! Correlation state and callback execution, kept apart from the
//! listeners that feed them.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`session`]: session registry
//! - [`store`]: sealed interaction storage
//! - [`callbacks`]: callback matching engine
//! - [`dsl`]: predicate/action evaluation (Lua)
//!
//! ## Service Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Service Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────────┐   ┌─────────────────────────────────┐ │
//! │  │  SessionRegistry │◄──│          MemoryStore            │ │
//! │  │                  │   │  - Seal with session key        │ │
//! │  │  - Register      │   │  - Per-session buckets          │ │
//! │  │  - Callbacks     │   │  - TTL / cap                    │ │
//! │  │  - Idle expiry   │   └─────────────────────────────────┘ │
//! │  └──────────────────┘                                       │
//! │                                                             │
//! │  ┌──────────────────┐   ┌─────────────────────────────────┐ │
//! │  │  CallbackEngine  │──►│     dyn DslEvaluator            │ │
//! │  │  - Timeout/each  │   │     (LuaEvaluator)              │ │
//! │  └──────────────────┘   └─────────────────────────────────┘ │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The store never outlives the registry entry: no session, no put
//! - Everything here is `Send + Sync` and shared through `Arc`
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod callbacks;
pub mod dsl;
pub mod session;
pub mod store;

pub use callbacks::{CallbackBinding, CallbackEngine, CallbackReport};
pub use dsl::{DslEvaluator, LuaEvaluator};
pub use session::{Session, SessionRegistry};
pub use store::{CorrelationStore, MemoryStore};
