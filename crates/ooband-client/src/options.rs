// ============================================
// File: crates/ooband-client/src/options.rs
// ============================================
//! # Client Options
//!
//! ## Creation Reason
//! Everything `Client::new` needs to know before it talks to a server.
//!
//! ## ⚠️ Important Note for Next Developer
//! - `identifier_variant` must match the server's `[identifier].variant`,
//!   otherwise listeners never recognize the minted labels
//! - The server URL's host becomes the suffix of every minted hostname

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use ooband_core::protocol::IdentifierVariant;
use ooband_transport::RetryPolicy;

use crate::error::{ClientError, Result};

/// Options for [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Base URL of the server API, e.g. `https://oob.example.com`.
    pub server_url: String,

    /// Keep the session on the server when the client closes.
    #[serde(default)]
    pub persistent: bool,

    /// Per-attempt request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Retries after the first attempt for register and deregister.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Identifier layout to mint.
    #[serde(default)]
    pub identifier_variant: IdentifierVariant,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

impl ClientOptions {
    /// Options for `server_url` with defaults for everything else.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            persistent: false,
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            identifier_variant: IdentifierVariant::default(),
        }
    }

    /// Sets whether the session outlives the client.
    #[must_use]
    pub const fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Sets the identifier variant.
    #[must_use]
    pub const fn with_variant(mut self, variant: IdentifierVariant) -> Self {
        self.identifier_variant = variant;
        self
    }

    /// Per-attempt request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Backoff policy for the HTTP transport.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            ..RetryPolicy::default()
        }
    }

    /// Validates the options and returns the parsed server URL.
    ///
    /// # Errors
    /// Returns `Configuration` for an unparsable or host-less URL, a
    /// scheme other than http/https, or a zero timeout.
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(self.server_url.trim())
            .map_err(|e| ClientError::configuration("server_url", e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::configuration(
                "server_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ClientError::configuration("server_url", "missing host"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::configuration(
                "request_timeout_secs",
                "must be greater than 0",
            ));
        }

        Ok(url)
    }
}
