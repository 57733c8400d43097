// ============================================
// File: crates/ooband-client/src/client.rs
// ============================================
//! # Client Façade
//!
//! ## Creation Reason
//! Owns one correlation session: the key pair, the correlation ID, and
//! the HTTP calls that register, poll and drop it.
//!
//! ## Session Lifecycle
//! ```text
//!   Client::new ──► POST /register ──► url() … url() ──► poll() … poll()
//!                                                            │
//!                                     close() ◄──────────────┘
//!                                        │
//!                        persistent? ──no──► POST /deregister
//!                             │
//!                            yes ──► session stays; resume() later
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `url()` never touches the network and never repeats a label
//! - `close` consumes the client; a failed deregister is returned, not panicked
//! - Interactions that will not open are skipped with a warning

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use ooband_common::CorrelationId;
use ooband_core::crypto::{open, ClientKeyPair, ClientPublicKey, SealedPayload};
use ooband_core::protocol::identifier::mint;
use ooband_core::protocol::{
    Callback, CallbackRequest, DeregisterRequest, IdentifierVariant, Interaction, PollResponse,
    RegisterRequest,
};
use ooband_transport::{HttpRequest, HttpResponse, HttpTransport, RetryingHttpClient};

use crate::error::{ClientError, Result};
use crate::options::ClientOptions;

// ============================================
// SessionState
// ============================================

/// Exported session, enough to resume a persistent session later.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "kebab-case")]
pub struct SessionState {
    /// Correlation ID the session is registered under.
    #[zeroize(skip)]
    pub correlation_id: CorrelationId,
    /// Base64 X25519 secret.
    pub secret_key: String,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("correlation_id", &self.correlation_id)
            .finish_non_exhaustive()
    }
}

// ============================================
// Client
// ============================================

/// A registered correlation session.
pub struct Client {
    correlation_id: CorrelationId,
    keys: ClientKeyPair,
    base_url: Url,
    host: String,
    persistent: bool,
    variant: IdentifierVariant,
    transport: Arc<dyn HttpTransport>,
}

impl Client {
    /// Generates a key pair and correlation ID and registers them.
    ///
    /// # Errors
    /// - `Configuration`: invalid options
    /// - `Registration`: the server refused or could not be reached
    pub async fn new(options: ClientOptions) -> Result<Self> {
        let transport = default_transport(&options)?;
        Self::with_transport(options, transport).await
    }

    /// Same as [`Client::new`] over a caller-supplied transport.
    ///
    /// # Errors
    /// See [`Client::new`].
    pub async fn with_transport(
        options: ClientOptions,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        Self::connect(
            options,
            transport,
            ClientKeyPair::generate(),
            CorrelationId::generate(),
        )
        .await
    }

    /// Re-registers an exported session, keeping its ID and keys.
    ///
    /// # Errors
    /// `Core` for a corrupt secret, otherwise as [`Client::new`].
    pub async fn resume(options: ClientOptions, state: &SessionState) -> Result<Self> {
        let transport = default_transport(&options)?;
        Self::resume_with_transport(options, state, transport).await
    }

    /// Same as [`Client::resume`] over a caller-supplied transport.
    ///
    /// # Errors
    /// See [`Client::resume`].
    pub async fn resume_with_transport(
        options: ClientOptions,
        state: &SessionState,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let mut secret = BASE64
            .decode(state.secret_key.trim())
            .map_err(|e| ClientError::configuration("secret_key", e.to_string()))?;
        let keys = ClientKeyPair::from_bytes(&secret);
        secret.zeroize();

        Self::connect(options, transport, keys?, state.correlation_id.clone()).await
    }

    async fn connect(
        options: ClientOptions,
        transport: Arc<dyn HttpTransport>,
        keys: ClientKeyPair,
        correlation_id: CorrelationId,
    ) -> Result<Self> {
        let base_url = options.validate()?;
        let host = base_url
            .host_str()
            .unwrap_or_default()
            .trim_matches(|c| c == '[' || c == ']')
            .to_owned();

        let client = Self {
            correlation_id,
            keys,
            base_url,
            host,
            persistent: options.persistent,
            variant: options.identifier_variant,
            transport,
        };
        client.register().await?;

        info!(
            correlation_id = %client.correlation_id,
            server = %client.base_url,
            persistent = client.persistent,
            "Client registered"
        );
        Ok(client)
    }

    async fn register(&self) -> Result<()> {
        let request = RegisterRequest {
            correlation_id: self.correlation_id.clone(),
            public_key: self.keys.public_key(),
            persistent: self.persistent,
            callbacks: Vec::new(),
        };
        let body = serde_json::to_vec(&request).map_err(ClientError::Encoding)?;

        let response = self
            .transport
            .execute(HttpRequest::post_json(self.endpoint("register"), body))
            .await
            .map_err(|e| ClientError::registration(e.to_string()))?;
        expect_ok(&response).map_err(ClientError::registration)
    }

    /// Drops the session unless it is persistent.
    ///
    /// # Errors
    /// `Deregistration` if the server could not be told; the session
    /// then lingers until it idles out.
    pub async fn close(self) -> Result<()> {
        if self.persistent {
            debug!(correlation_id = %self.correlation_id, "Persistent session kept");
            return Ok(());
        }

        let request = DeregisterRequest {
            correlation_id: self.correlation_id.clone(),
        };
        let body = serde_json::to_vec(&request).map_err(ClientError::Encoding)?;

        let outcome = match self
            .transport
            .execute(HttpRequest::post_json(self.endpoint("deregister"), body))
            .await
        {
            Ok(response) => expect_ok(&response).map_err(ClientError::deregistration),
            Err(e) => Err(ClientError::deregistration(e.to_string())),
        };

        match &outcome {
            Ok(()) => info!(correlation_id = %self.correlation_id, "Client deregistered"),
            Err(e) => warn!(correlation_id = %self.correlation_id, error = %e, "Deregistration failed"),
        }
        outcome
    }

    /// A fresh hostname `<identifier>.<server host>`.
    #[must_use]
    pub fn url(&self) -> String {
        let label = mint(&self.correlation_id, self.variant);
        let mut url = String::with_capacity(label.len() + 1 + self.host.len());
        url.push_str(&label);
        url.push('.');
        url.push_str(&self.host);
        url
    }

    /// Fetches, decrypts and returns pending interactions, oldest first.
    ///
    /// The server hands each interaction out once.
    ///
    /// # Errors
    /// `Poll` on a transport failure, an unknown session or a bad body.
    pub async fn poll(&self) -> Result<Vec<Interaction>> {
        let url = format!("{}?id={}", self.endpoint("poll"), self.correlation_id);
        let response = self
            .transport
            .execute(HttpRequest::get(url))
            .await
            .map_err(|e| ClientError::poll(e.to_string()))?;
        expect_ok(&response).map_err(ClientError::poll)?;

        let sealed: PollResponse = serde_json::from_slice(&response.body)
            .map_err(|e| ClientError::poll(format!("invalid poll body: {e}")))?;

        let mut interactions = Vec::with_capacity(sealed.data.len());
        for item in &sealed.data {
            match self.decrypt(item) {
                Ok(interaction) => interactions.push(interaction),
                Err(e) => warn!(correlation_id = %self.correlation_id, error = %e, "Skipping interaction"),
            }
        }
        interactions.sort_by_key(|i| i.timestamp);

        debug!(
            correlation_id = %self.correlation_id,
            received = sealed.data.len(),
            decrypted = interactions.len(),
            "Poll complete"
        );
        Ok(interactions)
    }

    fn decrypt(&self, item: &SealedPayload) -> Result<Interaction> {
        let plaintext = open(&self.keys, item).map_err(|e| ClientError::Decryption {
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&plaintext).map_err(|e| ClientError::Decryption {
            reason: format!("not an interaction: {e}"),
        })
    }

    /// Appends a callback to the server-side session.
    ///
    /// # Errors
    /// `Transport` if the server cannot be reached, `Registration` if it
    /// refuses the callback.
    pub async fn add_callback(&self, dsl: impl Into<String>, code: impl Into<String>) -> Result<()> {
        let request = CallbackRequest {
            correlation_id: self.correlation_id.clone(),
            callbacks: vec![Callback::new(dsl, code)],
        };
        let body = serde_json::to_vec(&request).map_err(ClientError::Encoding)?;

        let response = self
            .transport
            .execute(HttpRequest::post_json(self.endpoint("callback"), body))
            .await?;
        expect_ok(&response).map_err(ClientError::registration)
    }

    /// Exports the session for a later [`Client::resume`].
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        let mut secret = self.keys.to_bytes();
        let state = SessionState {
            correlation_id: self.correlation_id.clone(),
            secret_key: BASE64.encode(secret),
        };
        secret.zeroize();
        state
    }

    /// Correlation ID of this session.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Public key interactions are sealed to.
    #[must_use]
    pub fn public_key(&self) -> ClientPublicKey {
        self.keys.public_key()
    }

    /// Host minted hostnames end with.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns `true` if `close` keeps the session.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.as_str().trim_end_matches('/'))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("correlation_id", &self.correlation_id)
            .field("server", &self.base_url.as_str())
            .field("persistent", &self.persistent)
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}

fn default_transport(options: &ClientOptions) -> Result<Arc<dyn HttpTransport>> {
    let client = RetryingHttpClient::new(options.request_timeout(), options.retry_policy())
        .map_err(|e| ClientError::configuration("transport", e.to_string()))?;
    Ok(Arc::new(client))
}

fn expect_ok(response: &HttpResponse) -> std::result::Result<(), String> {
    if response.status == 200 {
        Ok(())
    } else {
        Err(format!("status {}: {}", response.status, response.text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use ooband_core::crypto::seal;
    use ooband_core::protocol::identifier::extract_identifier;
    use ooband_core::protocol::Protocol;
    use ooband_transport::{HttpMethod, TransportError};

    /// In-process stand-in for the server API.
    #[derive(Default)]
    struct FakeServer {
        sessions: Mutex<HashMap<String, ClientPublicKey>>,
        pending: Mutex<Vec<SealedPayload>>,
        requests: Mutex<Vec<HttpRequest>>,
        fail_with: Mutex<Option<u16>>,
        unreachable: Mutex<bool>,
    }

    impl FakeServer {
        fn deliver(&self, correlation_id: &str, interaction: &Interaction) {
            let key = self.sessions.lock()[correlation_id];
            let sealed = seal(&key, &serde_json::to_vec(interaction).unwrap()).unwrap();
            self.pending.lock().push(sealed);
        }

        fn paths(&self) -> Vec<String> {
            self.requests
                .lock()
                .iter()
                .map(|r| r.url.rsplit('/').next().unwrap().to_owned())
                .collect()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeServer {
        async fn execute(&self, request: HttpRequest) -> ooband_transport::Result<HttpResponse> {
            self.requests.lock().push(request.clone());
            if *self.unreachable.lock() {
                return Err(TransportError::Request {
                    url: request.url,
                    reason: "connection refused".into(),
                    transient: true,
                });
            }
            if let Some(status) = *self.fail_with.lock() {
                return Ok(HttpResponse { status, body: b"nope".to_vec() });
            }

            let body = request.body.clone().unwrap_or_default();
            let ok = |body: Vec<u8>| Ok(HttpResponse { status: 200, body });
            match (request.method, request.url.rsplit('/').next().unwrap_or_default()) {
                (HttpMethod::Post, "register") => {
                    let req: RegisterRequest = serde_json::from_slice(&body).unwrap();
                    self.sessions
                        .lock()
                        .insert(req.correlation_id.to_string(), req.public_key);
                    ok(br#"{"message":"registration successful"}"#.to_vec())
                }
                (HttpMethod::Post, "deregister") => {
                    let req: DeregisterRequest = serde_json::from_slice(&body).unwrap();
                    let found = self.sessions.lock().remove(req.correlation_id.as_str());
                    Ok(HttpResponse {
                        status: if found.is_some() { 200 } else { 404 },
                        body: Vec::new(),
                    })
                }
                (HttpMethod::Post, "callback") => ok(Vec::new()),
                (HttpMethod::Get, path) if path.starts_with("poll?id=") => {
                    let data = std::mem::take(&mut *self.pending.lock());
                    ok(serde_json::to_vec(&PollResponse { data }).unwrap())
                }
                _ => Ok(HttpResponse { status: 404, body: Vec::new() }),
            }
        }
    }

    async fn connect(server: &Arc<FakeServer>, options: ClientOptions) -> Result<Client> {
        Client::with_transport(options, Arc::clone(server) as Arc<dyn HttpTransport>).await
    }

    fn options() -> ClientOptions {
        ClientOptions::new("https://oob.example.com")
    }

    #[tokio::test]
    async fn test_new_registers_session() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options()).await.unwrap();

        assert_eq!(server.paths(), vec!["register"]);
        assert_eq!(
            server.sessions.lock().get(client.correlation_id().as_str()),
            Some(&client.public_key())
        );
    }

    #[tokio::test]
    async fn test_registration_refused() {
        let server = Arc::new(FakeServer::default());
        *server.fail_with.lock() = Some(503);

        let err = connect(&server, options()).await.unwrap_err();
        assert!(matches!(err, ClientError::Registration { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_is_configuration_error() {
        let server = Arc::new(FakeServer::default());
        let err = connect(&server, ClientOptions::new("::nope")).await.unwrap_err();

        assert!(matches!(err, ClientError::Configuration { .. }));
        assert!(server.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_url_embeds_correlation_id_and_host() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, ClientOptions::new("http://oob.example.com:8080/")).await.unwrap();

        let first = client.url();
        let second = client.url();
        assert_ne!(first, second);
        assert!(first.ends_with(".oob.example.com"));

        let extracted = extract_identifier(&first, IdentifierVariant::Extended.identifier_len()).unwrap();
        assert_eq!(extracted.correlation_id, client.correlation_id().as_str());
    }

    #[tokio::test]
    async fn test_poll_decrypts_and_sorts() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options()).await.unwrap();
        let cid = client.correlation_id().to_string();

        let mut late = Interaction::new(Protocol::Http, "b", "b", "GET / HTTP/1.1", "192.0.2.1");
        let mut early = Interaction::new(Protocol::Dns, "a", "a", "query", "192.0.2.2");
        early.timestamp = late.timestamp - chrono::Duration::seconds(5);
        late.raw_response = Some("ok".into());
        server.deliver(&cid, &late);
        server.deliver(&cid, &early);

        let interactions = client.poll().await.unwrap();
        assert_eq!(interactions, vec![early, late]);
        assert!(client.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_skips_foreign_payloads() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options()).await.unwrap();

        let stranger = ClientKeyPair::generate();
        server
            .pending
            .lock()
            .push(seal(&stranger.public_key(), b"{}").unwrap());

        assert!(client.poll().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_deregisters() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options()).await.unwrap();

        client.close().await.unwrap();
        assert_eq!(server.paths(), vec!["register", "deregister"]);
        assert!(server.sessions.lock().is_empty());
    }

    #[tokio::test]
    async fn test_persistent_close_keeps_session() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options().with_persistent(true)).await.unwrap();

        client.close().await.unwrap();
        assert_eq!(server.paths(), vec!["register"]);
        assert_eq!(server.sessions.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_close_failure_is_returned() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options()).await.unwrap();
        *server.unreachable.lock() = true;

        let err = client.close().await.unwrap_err();
        assert!(matches!(err, ClientError::Deregistration { .. }));
    }

    #[tokio::test]
    async fn test_resume_keeps_identity() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options().with_persistent(true)).await.unwrap();
        let state = client.session_state();
        let public_key = client.public_key();
        client.close().await.unwrap();

        let resumed = Client::resume_with_transport(
            options().with_persistent(true),
            &state,
            Arc::clone(&server) as Arc<dyn HttpTransport>,
        )
        .await
        .unwrap();

        assert_eq!(resumed.correlation_id(), &state.correlation_id);
        assert_eq!(resumed.public_key(), public_key);
    }

    #[tokio::test]
    async fn test_add_callback_posts_to_session() {
        let server = Arc::new(FakeServer::default());
        let client = connect(&server, options()).await.unwrap();

        client.add_callback("protocol == 'dns'", "log(to[1])").await.unwrap();

        let requests = server.requests.lock();
        let last = requests.last().unwrap();
        let body: CallbackRequest = serde_json::from_slice(last.body.as_ref().unwrap()).unwrap();
        assert_eq!(body.correlation_id, *client.correlation_id());
        assert_eq!(body.callbacks, vec![Callback::new("protocol == 'dns'", "log(to[1])")]);
    }
}
