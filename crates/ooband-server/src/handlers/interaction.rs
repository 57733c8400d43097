// ============================================
// File: crates/ooband-server/src/handlers/interaction.rs
// ============================================
//! # Interaction Handler
//!
//! ## Creation Reason
//! DNS, HTTP and SMTP listeners all end the same way: find an identifier
//! in the addressing, run the owner's callbacks, store the interaction.
//! Listeners build a `Capture` and hand it here.
//!
//! ## Processing Pipeline
//! ```text
//! Capture
//!   │
//!   ├─ extract identifier ── none ──► Ignored
//!   │
//!   ├─ session lookup ── found ──► CallbackEngine::run
//!   │                 └─ missing ─► warn (correlation miss)
//!   │
//!   └─ build Interaction JSON ──► store.put ── ok ──► Stored
//!                                           └─ err ─► Dropped
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Storing and running callbacks are separate conditions; neither one
//!   gates the other
//! - Nothing here may fail the protocol exchange; results are logged

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use ooband_core::error::CoreError;
use ooband_core::protocol::identifier::{extract_from_recipients, extract_identifier};
use ooband_core::protocol::{ExtractedIdentifier, Interaction, Protocol};

use crate::error::{Result, ServerError};
use crate::services::{CallbackBinding, CallbackEngine, CorrelationStore};

// ============================================
// Capture
// ============================================

/// Protocol-neutral view of one inbound exchange.
#[derive(Debug, Clone)]
pub struct Capture {
    /// Listener protocol.
    pub protocol: Protocol,
    /// Addresses searched for an identifier. For SMTP these are the
    /// envelope recipients; for DNS and HTTP they are host names.
    pub candidates: Vec<String>,
    /// Raw request text.
    pub raw_request: String,
    /// What the listener answered, if meaningful.
    pub raw_response: Option<String>,
    /// Peer address.
    pub remote_addr: SocketAddr,
    /// SMTP envelope sender; empty elsewhere.
    pub from: String,
    /// Recipients, query name or host exposed to callbacks.
    pub to: Vec<String>,
    /// DNS query type.
    pub q_type: Option<String>,
}

impl Capture {
    /// Starts a capture with no sender, recipients or response.
    pub fn new(protocol: Protocol, remote_addr: SocketAddr, raw_request: impl Into<String>) -> Self {
        Self {
            protocol,
            candidates: Vec::new(),
            raw_request: raw_request.into(),
            raw_response: None,
            remote_addr,
            from: String::new(),
            to: Vec::new(),
            q_type: None,
        }
    }

    fn extract(&self, identifier_len: usize) -> Option<ExtractedIdentifier> {
        match self.protocol {
            Protocol::Smtp => {
                extract_from_recipients(self.candidates.iter().map(String::as_str), identifier_len)
            }
            Protocol::Dns | Protocol::Http => self
                .candidates
                .iter()
                .find_map(|address| extract_identifier(address, identifier_len)),
        }
    }

    fn binding(&self) -> CallbackBinding {
        CallbackBinding {
            protocol: self.protocol,
            remote_addr: self.remote_addr.to_string(),
            from: self.from.clone(),
            to: self.to.clone(),
            data: self.raw_request.clone(),
        }
    }

    fn into_interaction(self, extracted: ExtractedIdentifier) -> Interaction {
        let mut interaction = Interaction::new(
            self.protocol,
            extracted.unique_id,
            extracted.full_id,
            self.raw_request,
            self.remote_addr.ip().to_string(),
        );
        interaction.q_type = self.q_type;
        interaction.raw_response = self.raw_response;
        if self.protocol == Protocol::Smtp {
            interaction.smtp_from = Some(self.from);
        }
        interaction
    }
}

// ============================================
// Outcome
// ============================================

/// What happened to a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No identifier in the addressing.
    Ignored,
    /// Sealed and stored for the session.
    Stored,
    /// Identifier found but the interaction could not be stored.
    Dropped,
}

// ============================================
// InteractionHandler
// ============================================

/// Shared capture pipeline.
#[derive(Clone)]
pub struct InteractionHandler {
    store: Arc<dyn CorrelationStore>,
    engine: CallbackEngine,
    identifier_len: usize,
}

impl InteractionHandler {
    /// Creates a handler matching labels of `identifier_len` characters.
    #[must_use]
    pub fn new(store: Arc<dyn CorrelationStore>, engine: CallbackEngine, identifier_len: usize) -> Self {
        Self {
            store,
            engine,
            identifier_len,
        }
    }

    /// Identifier length this handler matches.
    #[must_use]
    pub const fn identifier_len(&self) -> usize {
        self.identifier_len
    }

    /// Runs the pipeline for `capture`.
    pub async fn handle(&self, capture: Capture) -> Outcome {
        let Some(extracted) = capture.extract(self.identifier_len) else {
            trace!(protocol = %capture.protocol, remote = %capture.remote_addr, "No identifier in capture");
            return Outcome::Ignored;
        };

        match self.store.get(&extracted.correlation_id).await {
            Ok(session) => {
                let callbacks = session.callbacks();
                if !callbacks.is_empty() {
                    let report = self.engine.run(capture.binding(), &callbacks).await;
                    session.stats.record_actions(report.executed as u64);
                }
            }
            Err(_) => {
                let miss = ServerError::CorrelationMiss {
                    correlation_id: extracted.correlation_id.clone(),
                };
                warn!(protocol = %capture.protocol, remote = %capture.remote_addr, "{}", miss);
            }
        }

        let correlation_id = extracted.correlation_id.clone();
        let protocol = capture.protocol;
        match self.persist(&correlation_id, capture.into_interaction(extracted)).await {
            Ok(()) => {
                debug!(correlation_id = %correlation_id, %protocol, "Interaction captured");
                Outcome::Stored
            }
            Err(e) => {
                debug!(correlation_id = %correlation_id, %protocol, error = %e, "Interaction discarded");
                Outcome::Dropped
            }
        }
    }

    async fn persist(&self, correlation_id: &str, interaction: Interaction) -> Result<()> {
        let json = serde_json::to_vec(&interaction).map_err(CoreError::from)?;
        self.store.put(correlation_id, &json).await
    }
}

impl std::fmt::Debug for InteractionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionHandler")
            .field("identifier_len", &self.identifier_len)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;

    use ooband_common::CorrelationId;
    use ooband_core::crypto::{open, ClientKeyPair};
    use ooband_core::protocol::identifier::{mint, IdentifierVariant};
    use ooband_core::protocol::Callback;

    use crate::services::{DslEvaluator, MemoryStore, SessionRegistry};

    #[derive(Default)]
    struct Recorder {
        actions: Mutex<Vec<String>>,
    }

    impl DslEvaluator for Recorder {
        fn evaluate_predicate(&self, expr: &str, _binding: &CallbackBinding) -> Result<bool> {
            Ok(expr == "true")
        }

        fn execute_action(&self, code: &str, binding: &CallbackBinding) -> Result<()> {
            self.actions.lock().push(format!("{code}:{}", binding.protocol));
            Ok(())
        }
    }

    struct Fixture {
        handler: InteractionHandler,
        store: Arc<MemoryStore>,
        recorder: Arc<Recorder>,
        keys: ClientKeyPair,
        cid: CorrelationId,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(SessionRegistry::new(10, 8, Duration::from_secs(60)));
        let store = Arc::new(MemoryStore::new(registry, Duration::from_secs(60), 100));
        let recorder = Arc::new(Recorder::default());
        let engine = CallbackEngine::new(recorder.clone(), Duration::from_secs(1));
        let handler = InteractionHandler::new(
            store.clone(),
            engine,
            IdentifierVariant::Extended.identifier_len(),
        );

        let keys = ClientKeyPair::generate();
        let cid = CorrelationId::generate();
        store
            .registry()
            .register(
                cid.clone(),
                keys.public_key(),
                false,
                vec![Callback::new("true", "hit")],
            )
            .unwrap();

        Fixture {
            handler,
            store,
            recorder,
            keys,
            cid,
        }
    }

    fn smtp_capture(recipient: &str) -> Capture {
        let mut capture = Capture::new(
            Protocol::Smtp,
            "192.0.2.10:40000".parse().unwrap(),
            "Subject: hello\r\n\r\nbody",
        );
        capture.from = "sender@outside.test".into();
        capture.candidates = vec![recipient.to_owned()];
        capture.to = capture.candidates.clone();
        capture
    }

    #[tokio::test]
    async fn test_matching_capture_is_stored_and_fires_callbacks() {
        let f = fixture();
        let label = mint(&f.cid, IdentifierVariant::Extended);
        let outcome = f
            .handler
            .handle(smtp_capture(&format!("user@{label}.oob.test")))
            .await;

        assert_eq!(outcome, Outcome::Stored);
        assert_eq!(*f.recorder.actions.lock(), vec!["hit:smtp"]);

        let items = f.store.take(f.cid.as_str()).await.unwrap();
        let json = open(&f.keys, &items[0]).unwrap();
        let interaction: Interaction = serde_json::from_slice(&json).unwrap();
        assert_eq!(interaction.unique_id, label);
        assert_eq!(interaction.remote_address, "192.0.2.10");
        assert_eq!(interaction.smtp_from.as_deref(), Some("sender@outside.test"));
    }

    #[tokio::test]
    async fn test_short_domain_stores_nothing() {
        let f = fixture();
        let outcome = f.handler.handle(smtp_capture("user@short.domain.com")).await;

        assert_eq!(outcome, Outcome::Ignored);
        assert!(f.store.is_empty());
        assert!(f.recorder.actions.lock().is_empty());
    }

    #[tokio::test]
    async fn test_deregistered_session_reaches_no_callback() {
        let f = fixture();
        f.store.registry().deregister(f.cid.as_str());

        let label = mint(&f.cid, IdentifierVariant::Extended);
        let outcome = f
            .handler
            .handle(smtp_capture(&format!("user@{label}.oob.test")))
            .await;

        assert_eq!(outcome, Outcome::Dropped);
        assert!(f.recorder.actions.lock().is_empty());
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_dns_capture_uses_host_candidates() {
        let f = fixture();
        let label = mint(&f.cid, IdentifierVariant::Extended);
        let mut capture = Capture::new(Protocol::Dns, "198.51.100.1:5353".parse().unwrap(), "query");
        capture.candidates = vec![format!("a.{label}.oob.test.")];
        capture.q_type = Some("A".into());

        assert_eq!(f.handler.handle(capture).await, Outcome::Stored);

        let items = f.store.list(f.cid.as_str()).await.unwrap();
        let interaction: Interaction =
            serde_json::from_slice(&open(&f.keys, &items[0]).unwrap()).unwrap();
        assert_eq!(interaction.full_id, format!("a.{label}"));
        assert_eq!(interaction.q_type.as_deref(), Some("A"));
    }
}
