// ============================================
// File: crates/ooband-core/src/protocol/messages.rs
// ============================================
//! # HTTP API Messages
//!
//! JSON bodies exchanged between `ooband-client` and the server API.
//! Field names are kebab-case on the wire.
//!
//! ## Endpoints
//! ```text
//! POST /register    RegisterRequest    ──► MessageResponse
//! POST /deregister  DeregisterRequest  ──► MessageResponse
//! POST /callback    CallbackRequest    ──► MessageResponse
//! GET  /poll?id=…                      ──► PollResponse
//! (any failure)                        ──► ErrorResponse
//! ```

use serde::{Deserialize, Serialize};

use ooband_common::CorrelationId;

use crate::crypto::{ClientPublicKey, SealedPayload};

/// A client-declared (predicate, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    /// Predicate expression; the action runs when it evaluates to true.
    pub dsl: String,
    /// Action code run with the same binding.
    pub code: String,
}

impl Callback {
    /// Creates a callback.
    pub fn new(dsl: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            dsl: dsl.into(),
            code: code.into(),
        }
    }
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegisterRequest {
    /// Session key chosen by the client.
    pub correlation_id: CorrelationId,
    /// Key interactions are sealed to.
    pub public_key: ClientPublicKey,
    /// Persistent sessions are exempt from idle expiry.
    #[serde(default)]
    pub persistent: bool,
    /// Callbacks attached at registration time.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callbacks: Vec<Callback>,
}

/// Body of `POST /deregister`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeregisterRequest {
    /// Session to drop.
    pub correlation_id: CorrelationId,
}

/// Body of `POST /callback`; appends to the session's callback list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CallbackRequest {
    /// Target session.
    pub correlation_id: CorrelationId,
    /// Callbacks to append, in order.
    pub callbacks: Vec<Callback>,
}

/// Query string of `GET /poll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollQuery {
    /// Session to drain.
    pub id: CorrelationId,
}

/// Response of `GET /poll`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollResponse {
    /// Sealed interaction records, oldest first.
    #[serde(default)]
    pub data: Vec<SealedPayload>,
}

/// Success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable status.
    pub message: String,
}

impl MessageResponse {
    /// Creates a response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: String,
}

impl ErrorResponse {
    /// Creates a response.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
