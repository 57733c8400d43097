// ============================================
// File: crates/ooband-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Wires configuration, services and listeners together and owns the
//! server lifecycle.
//!
//! ## Main Functionality
//! - `Server`: lifecycle (start, wait for Ctrl+C, shutdown)
//! - `RunningServer`: spawned tasks and the addresses actually bound
//! - Periodic cleanup of idle sessions and stale interactions
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────┐    │
//! │  │ HTTP Task│ │ DNS Task │ │SMTP Tasks│ │ Cleanup Task │    │
//! │  │ API +    │ │ UDP      │ │ one per  │ │ idle sessions│    │
//! │  │ requests │ │ answers  │ │ port     │ │ stale items  │    │
//! │  └────┬─────┘ └────┬─────┘ └────┬─────┘ └──────┬───────┘    │
//! │       └────────────┼────────────┘              │            │
//! │                    ▼                           ▼            │
//! │        ┌──────────────────────┐   ┌──────────────────────┐  │
//! │        │  InteractionHandler  │──►│ SessionRegistry      │  │
//! │        │  CallbackEngine      │   │ MemoryStore          │  │
//! │        └──────────────────────┘   └──────────────────────┘  │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The HTTP listener always runs because it carries the client API;
//!   disabling `http` only stops request capture
//! - Ports 53/25/80 need privileges; tests bind port 0
//! - Shutdown is one broadcast; every task selects on it
//!
//! ## Last Modified
//! v0.1.0 - Initial server implementation

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ooband_core::protocol::Protocol;
use ooband_transport::{bind_tcp, Transport, UdpTransport};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::handlers::{http, DnsListener, HttpState, InteractionHandler, SmtpListener};
use crate::services::{
    CallbackEngine, CorrelationStore, LuaEvaluator, MemoryStore, SessionRegistry,
};

/// Time given to each task after the shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Slack between the Lua deadline and the engine timeout.
const CALLBACK_GRACE: Duration = Duration::from_millis(100);

// ============================================
// Server
// ============================================

/// ooband interaction server.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Run with `server.run().await`, or `start()` to get the bound addresses
/// 3. Shutdown via Ctrl+C or `shutdown()`
pub struct Server {
    config: ServerConfig,
    shutdown: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Addresses the listeners actually bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerAddrs {
    /// API and capture listener.
    pub http: SocketAddr,
    /// DNS socket, if enabled.
    pub dns: Option<SocketAddr>,
    /// SMTP sockets, if enabled.
    pub smtp: Vec<SocketAddr>,
}

/// Handle to the tasks spawned by [`Server::start`].
pub struct RunningServer {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    addrs: ListenerAddrs,
    registry: Arc<SessionRegistry>,
    dns: Option<Arc<UdpTransport>>,
}

impl Server {
    /// Creates a server; nothing is bound until `start`.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Runs the server until Ctrl+C or `shutdown`.
    ///
    /// # Errors
    /// Returns error if a listener cannot be bound.
    pub async fn run(&self) -> Result<()> {
        info!("Starting ooband server v{}", env!("CARGO_PKG_VERSION"));

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let running = self.start().await?;
        info!(
            domain = %self.config.network.normalized_domain(),
            http = %running.addrs.http,
            dns = ?running.addrs.dns,
            smtp = ?running.addrs.smtp,
            "Server started successfully"
        );

        tokio::select! {
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
            },
            _ = shutdown_rx.recv() => info!("Shutdown requested"),
        }

        info!("Shutting down server...");
        self.shutdown();
        running.join().await;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Binds every enabled listener and spawns its task.
    ///
    /// # Errors
    /// Returns `StartupFailed` if a socket cannot be bound.
    pub async fn start(&self) -> Result<RunningServer> {
        let limits = &self.config.limits;
        let storage = &self.config.storage;
        let network = &self.config.network;

        let registry = Arc::new(SessionRegistry::new(
            limits.max_sessions,
            limits.max_callbacks_per_session,
            limits.session_timeout(),
        ));
        let store = Arc::new(MemoryStore::new(
            Arc::clone(&registry),
            storage.interaction_ttl(),
            storage.max_interactions_per_session,
        ));
        let engine = CallbackEngine::new(
            Arc::new(LuaEvaluator::new(limits.callback_timeout())),
            limits.callback_timeout() + CALLBACK_GRACE,
        );
        let handler = InteractionHandler::new(
            Arc::clone(&store) as Arc<dyn CorrelationStore>,
            engine,
            self.config.identifier_len(),
        );
        let domain = network.normalized_domain();

        info!(
            max_sessions = limits.max_sessions,
            identifier_len = self.config.identifier_len(),
            "Services initialized"
        );

        let mut tasks = Vec::new();

        // HTTP: API always, capture when enabled
        let http_listener = bind_tcp(network.http_addr()).map_err(|e| {
            ServerError::startup_failed(format!("HTTP bind on {} failed: {e}", network.http_addr()))
        })?;
        let http_addr = http_listener.local_addr()?;
        let mut state = HttpState::new(
            Arc::clone(&registry),
            Arc::clone(&store) as Arc<dyn CorrelationStore>,
            handler.clone(),
            limits.max_http_body_bytes,
        );
        if !network.is_enabled(Protocol::Http) {
            state = state.api_only();
        }
        let http_rx = self.shutdown_tx.subscribe();
        tasks.push((
            "http",
            tokio::spawn(async move {
                if let Err(e) = http::serve(http_listener, http::router(state), http_rx).await {
                    error!(error = %e, "HTTP listener failed");
                }
            }),
        ));

        // DNS
        let mut dns = None;
        let mut dns_addr = None;
        if network.is_enabled(Protocol::Dns) {
            let udp = Arc::new(UdpTransport::bind_addr(network.dns_addr()).await.map_err(|e| {
                ServerError::startup_failed(format!("DNS bind on {} failed: {e}", network.dns_addr()))
            })?);
            dns_addr = Some(udp.local_addr()?);

            let listener = Arc::new(DnsListener::new(handler.clone(), &domain, network.public_ip));
            let transport = Arc::clone(&udp) as Arc<dyn Transport>;
            tasks.push((
                "dns",
                tokio::spawn(listener.serve(transport, self.shutdown_tx.subscribe())),
            ));
            dns = Some(udp);
        }

        // SMTP
        let mut smtp_addrs = Vec::new();
        if network.is_enabled(Protocol::Smtp) {
            let smtp = Arc::new(SmtpListener::new(
                handler.clone(),
                domain.clone(),
                limits.max_smtp_message_bytes,
            ));
            for addr in network.smtp_addrs() {
                let listener = bind_tcp(addr).map_err(|e| {
                    ServerError::startup_failed(format!("SMTP bind on {addr} failed: {e}"))
                })?;
                smtp_addrs.push(listener.local_addr()?);
                tasks.push((
                    "smtp",
                    tokio::spawn(Arc::clone(&smtp).serve(listener, self.shutdown_tx.subscribe())),
                ));
            }
        }

        tasks.push(("cleanup", self.spawn_cleanup_task(Arc::clone(&registry), store)));

        Ok(RunningServer {
            tasks,
            addrs: ListenerAddrs {
                http: http_addr,
                dns: dns_addr,
                smtp: smtp_addrs,
            },
            registry,
            dns,
        })
    }

    /// Spawns the expiry task.
    fn spawn_cleanup_task(
        &self,
        registry: Arc<SessionRegistry>,
        store: Arc<MemoryStore>,
    ) -> JoinHandle<()> {
        let shutdown = Arc::clone(&self.shutdown);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = self.config.storage.cleanup_interval();

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("Cleanup task received shutdown signal");
                        break;
                    }
                    _ = interval_timer.tick() => {
                        if shutdown.load(Ordering::SeqCst) {
                            break;
                        }

                        let expired = registry.cleanup_expired();
                        let removed = store.expire().await;

                        debug!(
                            sessions = registry.count(),
                            expired_sessions = expired.len(),
                            expired_interactions = removed,
                            "Cleanup cycle complete"
                        );
                    }
                }
            }

            debug!("Cleanup task exiting");
        })
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("domain", &self.config.network.domain)
            .field("protocols", &self.config.network.protocols)
            .finish_non_exhaustive()
    }
}

// ============================================
// RunningServer
// ============================================

impl RunningServer {
    /// Addresses actually bound.
    #[must_use]
    pub const fn addrs(&self) -> &ListenerAddrs {
        &self.addrs
    }

    /// Live session registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Waits for every task to finish; call after `Server::shutdown`.
    pub async fn join(self) {
        for (name, task) in self.tasks {
            match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
                Ok(Ok(())) => debug!("Task '{}' completed", name),
                Ok(Err(e)) => warn!("Task '{}' failed: {}", name, e),
                Err(_) => warn!("Task '{}' timed out during shutdown", name),
            }
        }

        if let Some(udp) = self.dns {
            if let Err(e) = udp.shutdown().await {
                warn!("DNS socket shutdown error: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for RunningServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningServer")
            .field("addrs", &self.addrs)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn local_config(protocols: Vec<Protocol>) -> ServerConfig {
        let mut config = ServerConfig::default();
        config.network.listen_ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.network.protocols = protocols;
        config.network.dns_port = 0;
        config.network.http_port = 0;
        config.network.smtp_ports = vec![0];
        config
    }

    #[tokio::test]
    async fn test_start_binds_enabled_listeners() {
        let server = Server::new(local_config(vec![Protocol::Dns, Protocol::Http, Protocol::Smtp]));
        let running = server.start().await.unwrap();

        assert_ne!(running.addrs().http.port(), 0);
        assert!(running.addrs().dns.is_some());
        assert_eq!(running.addrs().smtp.len(), 1);

        server.shutdown();
        running.join().await;
    }

    #[tokio::test]
    async fn test_disabled_protocols_are_not_bound() {
        let server = Server::new(local_config(vec![Protocol::Http]));
        let running = server.start().await.unwrap();

        assert!(running.addrs().dns.is_none());
        assert!(running.addrs().smtp.is_empty());

        server.shutdown();
        running.join().await;
    }

    #[tokio::test]
    async fn test_bind_conflict_is_startup_failure() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = local_config(vec![Protocol::Http]);
        config.network.http_port = taken.local_addr().unwrap().port();

        let server = Server::new(config);
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::StartupFailed { .. }));
    }
}
