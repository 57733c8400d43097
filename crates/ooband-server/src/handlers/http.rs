// ============================================
// File: crates/ooband-server/src/handlers/http.rs
// ============================================
//! # HTTP Listener and Client API
//!
//! ## Creation Reason
//! One axum router serves both sides of the HTTP port: the client API
//! that manages sessions, and the catch-all capture endpoint that records
//! requests made to generated hostnames.
//!
//! ## Routes
//! | Method | Path          | Purpose                                  |
//! |--------|---------------|------------------------------------------|
//! | POST   | `/register`   | create or replace a session              |
//! | POST   | `/deregister` | drop a session                           |
//! | GET    | `/poll?id=`   | drain sealed interactions                |
//! | POST   | `/callback`   | append callbacks to a session            |
//! | *      | anything else | capture and reflect                      |
//!
//! ## Capture Response
//! ```text
//! Host: <label>.oob.example  ──►  <html><head></head><body>reverse(label)</body></html>
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Capture responses are always 200; capture results are only logged
//! - API errors answer with `{"error": "..."}` and `ServerError::status_code`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, Request, State};
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use ooband_common::error::CommonError;
use ooband_core::protocol::identifier::reflect_label;
use ooband_core::protocol::{
    CallbackRequest, DeregisterRequest, ErrorResponse, MessageResponse, PollQuery, PollResponse,
    Protocol, RegisterRequest,
};

use crate::error::ServerError;
use crate::handlers::interaction::{Capture, InteractionHandler};
use crate::services::{CorrelationStore, SessionRegistry};

// ============================================
// State
// ============================================

/// Shared state of the HTTP router.
#[derive(Clone)]
pub struct HttpState {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn CorrelationStore>,
    handler: InteractionHandler,
    max_body_bytes: usize,
    capture_requests: bool,
}

impl HttpState {
    /// Bundles what the router needs.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn CorrelationStore>,
        handler: InteractionHandler,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            registry,
            store,
            handler,
            max_body_bytes,
            capture_requests: true,
        }
    }

    /// Serves the API only; non-API requests get 404 and are not captured.
    #[must_use]
    pub fn api_only(mut self) -> Self {
        self.capture_requests = false;
        self
    }
}

/// Builds the API and capture router.
pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/deregister", post(deregister))
        .route("/poll", get(poll))
        .route("/callback", post(add_callbacks))
        .fallback(capture_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` fires.
///
/// # Errors
/// Returns the I/O error that stopped the server.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "HTTP listener started");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown.recv().await;
        info!("HTTP listener shutting down");
    })
    .await
}

// ============================================
// API Errors
// ============================================

/// `ServerError` rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub ServerError);

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(error = %self.0, "API request failed");
        } else {
            debug!(error = %self.0, status = status.as_u16(), "API request rejected");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(CommonError::invalid_input("body", e.to_string()).into()))
}

// ============================================
// API Handlers
// ============================================

async fn register(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: RegisterRequest = parse_json(&body)?;
    state.registry.register(
        request.correlation_id,
        request.public_key,
        request.persistent,
        request.callbacks,
    )?;
    Ok(Json(MessageResponse::new("registration successful")))
}

async fn deregister(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: DeregisterRequest = parse_json(&body)?;
    state
        .registry
        .deregister(request.correlation_id.as_str())
        .ok_or_else(|| ServerError::session_not_found(request.correlation_id.as_str()))?;
    Ok(Json(MessageResponse::new("deregistration successful")))
}

async fn poll(
    State(state): State<HttpState>,
    Query(query): Query<PollQuery>,
) -> Result<Json<PollResponse>, ApiError> {
    let data = state.store.take(query.id.as_str()).await?;
    Ok(Json(PollResponse { data }))
}

async fn add_callbacks(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let request: CallbackRequest = parse_json(&body)?;
    let total = state
        .registry
        .append_callbacks(request.correlation_id.as_str(), request.callbacks)?;
    Ok(Json(MessageResponse::new(format!("{total} callbacks registered"))))
}

// ============================================
// Capture
// ============================================

async fn capture_request(
    State(state): State<HttpState>,
    connect: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Response {
    if !state.capture_requests {
        return StatusCode::NOT_FOUND.into_response();
    }
    let peer = connect.map_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)), |ConnectInfo(addr)| addr);
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                peer = %peer,
                limit = state.max_body_bytes,
                error = %e,
                "HTTP request body over limit, recording a marker instead"
            );
            Bytes::from(omitted_body_marker(state.max_body_bytes))
        }
    };

    let host = request_host(&parts);
    let reflection = reflect_label(&host, state.handler.identifier_len());
    let page = format!("<html><head></head><body>{reflection}</body></html>");

    let mut capture = Capture::new(Protocol::Http, peer, render_request(&parts, &body));
    capture.raw_response = Some(format!("HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n{page}"));
    capture.candidates = vec![host.clone(), parts.uri.path().replace('/', ".")];
    capture.to = vec![host];

    let outcome = state.handler.handle(capture).await;
    debug!(peer = %peer, ?outcome, "HTTP request processed");

    Html(page).into_response()
}

/// Stands in for a body that was not read in full.
fn omitted_body_marker(limit: usize) -> String {
    format!("[body omitted: larger than {limit} bytes]")
}

/// `Host` header without its port.
fn request_host(parts: &Parts) -> String {
    let host = parts
        .headers
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| parts.uri.host())
        .unwrap_or_default();

    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or_default().to_owned();
    }
    host.split(':').next().unwrap_or_default().to_owned()
}

/// Rebuilds the request as HTTP/1.x text.
fn render_request(parts: &Parts, body: &[u8]) -> String {
    let mut raw = format!("{} {} {:?}\r\n", parts.method, parts.uri, parts.version);
    for (name, value) in &parts.headers {
        raw.push_str(name.as_str());
        raw.push_str(": ");
        raw.push_str(&String::from_utf8_lossy(value.as_bytes()));
        raw.push_str("\r\n");
    }
    raw.push_str("\r\n");
    raw.push_str(&String::from_utf8_lossy(body));
    raw
}

impl std::fmt::Debug for HttpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpState")
            .field("registry", &self.registry)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("capture_requests", &self.capture_requests)
            .finish_non_exhaustive()
    }
}
