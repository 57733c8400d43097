// ============================================
// File: crates/ooband-server/src/services/session.rs
// ============================================
//! # Session Registry
//!
//! ## Creation Reason
//! Maps correlation IDs to the public key interactions are sealed with,
//! the client's callbacks and its persistence flag.
//!
//! ## Main Functionality
//! - `Session`: one registered client
//! - `SessionRegistry`: concurrent correlation ID → session map
//!
//! ## Session Lifecycle
//! ```text
//! ┌──────────┐    register     ┌────────────┐   register (same id)
//! │  (none)  │ ──────────────► │ Registered │ ◄──────────┐
//! └──────────┘                 └─────┬──────┘ ───────────┘ replaces
//!                                    │        append_callbacks
//!                    ┌───────────────┼───────────────┐
//!                    ▼               ▼               ▼
//!               deregister     idle timeout      (persistent:
//!                    │        (non-persistent)    never idles out)
//!                    └───────┬───────┘
//!                            ▼
//!                       ┌─────────┐
//!                       │ Removed │
//!                       └─────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Re-registering an ID replaces the whole session, key included;
//!   later sealing uses the new key
//! - The limit only applies to new IDs, so client retries never fail on it
//! - Callbacks are append-only

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use ooband_common::error::CommonError;
use ooband_common::time::AtomicInstant;
use ooband_common::CorrelationId;
use ooband_core::crypto::ClientPublicKey;
use ooband_core::protocol::Callback;

use crate::error::{Result, ServerError};

// ============================================
// Session Statistics
// ============================================

/// Per-session counters.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Interactions stored for this session.
    pub interactions: AtomicU64,
    /// Actions executed for this session.
    pub actions_fired: AtomicU64,
}

impl SessionStats {
    /// Counts one stored interaction.
    pub fn record_interaction(&self) {
        self.interactions.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts executed actions.
    pub fn record_actions(&self, count: u64) {
        self.actions_fired.fetch_add(count, Ordering::Relaxed);
    }
}

// ============================================
// Session
// ============================================

/// A registered client.
pub struct Session {
    /// Registry key.
    pub correlation_id: CorrelationId,
    /// Key interactions are sealed to.
    pub public_key: ClientPublicKey,
    /// Exempt from idle expiry.
    pub persistent: bool,
    callbacks: RwLock<Vec<Callback>>,
    /// Registration time.
    pub created_at: Instant,
    /// Last poll or registration.
    pub last_activity: AtomicInstant,
    /// Counters.
    pub stats: SessionStats,
}

impl Session {
    /// Creates a session.
    #[must_use]
    pub fn new(
        correlation_id: CorrelationId,
        public_key: ClientPublicKey,
        persistent: bool,
        callbacks: Vec<Callback>,
    ) -> Self {
        Self {
            correlation_id,
            public_key,
            persistent,
            callbacks: RwLock::new(callbacks),
            created_at: Instant::now(),
            last_activity: AtomicInstant::now(),
            stats: SessionStats::default(),
        }
    }

    /// Snapshot of the callback list, in declaration order.
    #[must_use]
    pub fn callbacks(&self) -> Vec<Callback> {
        self.callbacks.read().clone()
    }

    /// Number of callbacks.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.callbacks.read().len()
    }

    /// Marks the session as active now.
    pub fn touch(&self) {
        self.last_activity.touch();
    }

    /// Time since last activity.
    #[must_use]
    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// `true` if the session may be dropped for inactivity.
    #[must_use]
    pub fn is_expired(&self, timeout: Duration) -> bool {
        !self.persistent && self.last_activity.has_elapsed(timeout)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("correlation_id", &self.correlation_id)
            .field("public_key", &self.public_key)
            .field("persistent", &self.persistent)
            .field("callbacks", &self.callback_count())
            .field("idle_time", &self.idle_time())
            .finish_non_exhaustive()
    }
}

// ============================================
// Session Registry
// ============================================

/// All registered sessions.
pub struct SessionRegistry {
    sessions: DashMap<CorrelationId, Arc<Session>>,
    max_sessions: usize,
    max_callbacks: usize,
    session_timeout: Duration,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(max_sessions: usize, max_callbacks: usize, session_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            max_callbacks,
            session_timeout,
        }
    }

    /// Registers `correlation_id`, replacing any existing session.
    ///
    /// # Errors
    /// - `SessionLimitReached`: the ID is new and the registry is full
    /// - `InvalidInput`: more callbacks than allowed per session
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        public_key: ClientPublicKey,
        persistent: bool,
        callbacks: Vec<Callback>,
    ) -> Result<Arc<Session>> {
        if !self.sessions.contains_key(&correlation_id) && self.sessions.len() >= self.max_sessions {
            return Err(ServerError::SessionLimitReached {
                limit: self.max_sessions,
            });
        }
        self.check_callback_limit(callbacks.len())?;

        let session = Arc::new(Session::new(
            correlation_id.clone(),
            public_key,
            persistent,
            callbacks,
        ));
        let replaced = self
            .sessions
            .insert(correlation_id.clone(), Arc::clone(&session))
            .is_some();

        info!(
            correlation_id = %correlation_id,
            persistent,
            callbacks = session.callback_count(),
            replaced,
            "Session registered"
        );

        Ok(session)
    }

    /// Removes a session.
    pub fn deregister(&self, correlation_id: &str) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(correlation_id).map(|(_, s)| s);

        if let Some(session) = &removed {
            info!(
                correlation_id = %correlation_id,
                interactions = session.stats.interactions.load(Ordering::Relaxed),
                actions_fired = session.stats.actions_fired.load(Ordering::Relaxed),
                "Session deregistered"
            );
        }

        removed
    }

    /// Looks up a session.
    #[must_use]
    pub fn get(&self, correlation_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(correlation_id).map(|r| Arc::clone(r.value()))
    }

    /// Looks up a session, failing with `SessionNotFound`.
    ///
    /// # Errors
    /// Returns `SessionNotFound` for unknown IDs.
    pub fn get_or_error(&self, correlation_id: &str) -> Result<Arc<Session>> {
        self.get(correlation_id)
            .ok_or_else(|| ServerError::session_not_found(correlation_id))
    }

    /// Appends callbacks to an existing session; returns the new total.
    ///
    /// # Errors
    /// - `SessionNotFound`: unknown ID
    /// - `InvalidInput`: the per-session callback limit would be exceeded
    pub fn append_callbacks(&self, correlation_id: &str, callbacks: Vec<Callback>) -> Result<usize> {
        let session = self.get_or_error(correlation_id)?;
        let mut list = session.callbacks.write();
        self.check_callback_limit(list.len() + callbacks.len())?;

        list.extend(callbacks);
        let total = list.len();
        drop(list);

        debug!(correlation_id = %correlation_id, total, "Callbacks appended");
        Ok(total)
    }

    /// Marks a session as active.
    pub fn touch(&self, correlation_id: &str) {
        if let Some(session) = self.get(correlation_id) {
            session.touch();
        }
    }

    /// Number of sessions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// `true` if no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drops non-persistent sessions idle past the timeout.
    pub fn cleanup_expired(&self) -> Vec<CorrelationId> {
        let expired: Vec<CorrelationId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(self.session_timeout))
            .map(|entry| entry.key().clone())
            .collect();

        for id in &expired {
            debug!(correlation_id = %id, "Session expired");
            self.sessions.remove(id);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Cleaned up expired sessions");
        }

        expired
    }

    fn check_callback_limit(&self, count: usize) -> Result<()> {
        if count > self.max_callbacks {
            return Err(CommonError::invalid_input(
                "callbacks",
                format!("at most {} callbacks per session", self.max_callbacks),
            )
            .into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.count())
            .field("max_sessions", &self.max_sessions)
            .field("session_timeout", &self.session_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ooband_core::crypto::ClientKeyPair;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(100, 4, Duration::from_secs(300))
    }

    fn id(s: &str) -> CorrelationId {
        s.parse().unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = registry();
        let key = ClientKeyPair::generate().public_key();
        registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), key, false, Vec::new())
            .unwrap();

        let session = registry.get("aaaaaaaaaaaaaaaaaaaa").unwrap();
        assert_eq!(session.public_key, key);
        assert_eq!(registry.count(), 1);
        assert!(registry.get("bbbbbbbbbbbbbbbbbbbb").is_none());
    }

    #[test]
    fn test_reregister_replaces_key() {
        let registry = registry();
        let first = ClientKeyPair::generate().public_key();
        let second = ClientKeyPair::generate().public_key();

        registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), first, false, Vec::new())
            .unwrap();
        registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), second, false, Vec::new())
            .unwrap();

        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get("aaaaaaaaaaaaaaaaaaaa").unwrap().public_key, second);
    }

    #[test]
    fn test_limit_applies_to_new_ids_only() {
        let registry = SessionRegistry::new(1, 4, Duration::from_secs(300));
        let key = ClientKeyPair::generate().public_key();

        registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), key, false, Vec::new())
            .unwrap();
        assert!(registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), key, false, Vec::new())
            .is_ok());
        assert!(matches!(
            registry.register(id("bbbbbbbbbbbbbbbbbbbb"), key, false, Vec::new()),
            Err(ServerError::SessionLimitReached { limit: 1 })
        ));
    }

    #[test]
    fn test_deregister() {
        let registry = registry();
        let key = ClientKeyPair::generate().public_key();
        registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), key, false, Vec::new())
            .unwrap();

        assert!(registry.deregister("aaaaaaaaaaaaaaaaaaaa").is_some());
        assert!(registry.get("aaaaaaaaaaaaaaaaaaaa").is_none());
        assert!(registry.deregister("aaaaaaaaaaaaaaaaaaaa").is_none());
    }

    #[test]
    fn test_append_callbacks() {
        let registry = registry();
        let key = ClientKeyPair::generate().public_key();
        registry
            .register(
                id("aaaaaaaaaaaaaaaaaaaa"),
                key,
                false,
                vec![Callback::new("true", "log('a')")],
            )
            .unwrap();

        let total = registry
            .append_callbacks("aaaaaaaaaaaaaaaaaaaa", vec![Callback::new("false", "log('b')")])
            .unwrap();
        assert_eq!(total, 2);

        let callbacks = registry.get("aaaaaaaaaaaaaaaaaaaa").unwrap().callbacks();
        assert_eq!(callbacks[1].code, "log('b')");

        assert!(matches!(
            registry.append_callbacks("bbbbbbbbbbbbbbbbbbbb", Vec::new()),
            Err(ServerError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_callback_limit() {
        let registry = registry();
        let key = ClientKeyPair::generate().public_key();
        let many = vec![Callback::new("true", ""); 5];
        assert!(registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), key, false, many)
            .is_err());
    }

    #[test]
    fn test_cleanup_skips_persistent_sessions() {
        let registry = SessionRegistry::new(10, 4, Duration::from_millis(10));
        let key = ClientKeyPair::generate().public_key();
        registry
            .register(id("aaaaaaaaaaaaaaaaaaaa"), key, false, Vec::new())
            .unwrap();
        registry
            .register(id("bbbbbbbbbbbbbbbbbbbb"), key, true, Vec::new())
            .unwrap();

        std::thread::sleep(Duration::from_millis(30));
        let expired = registry.cleanup_expired();

        assert_eq!(expired, vec![id("aaaaaaaaaaaaaaaaaaaa")]);
        assert!(registry.get("bbbbbbbbbbbbbbbbbbbb").is_some());
    }
}
