// ============================================
// File: crates/ooband-server/src/services/store.rs
// ============================================
//! # Correlation Store
//!
//! ## Creation Reason
//! Keeps captured interactions per correlation ID until the client polls
//! them. Everything is sealed to the session's public key before it is
//! stored, so nothing readable sits in memory between capture and poll.
//!
//! ## Main Functionality
//! - `CorrelationStore`: async storage contract used by listeners and the API
//! - `MemoryStore`: DashMap-backed implementation with TTL and per-session cap
//!
//! ## Storage Flow
//! ```text
//! listener ──► put(cid, json) ──► registry.get(cid) ──► seal(pubkey, json)
//!                                      │                      │
//!                                  None: SessionNotFound      ▼
//!                                                  bucket[cid].push_back
//!                                                  (evict front past cap)
//!
//! /poll ──► take(cid) ──► drain bucket[cid]
//! cleanup task ──► expire() ──► drop orphaned buckets and stale items
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `put` seals with the key current at call time; a re-register
//!   affects only interactions stored afterwards
//! - Items are ordered per session only, never across protocols

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info};

use ooband_common::CorrelationId;
use ooband_core::crypto::{seal, SealedPayload};

use crate::error::{Result, ServerError};
use crate::services::session::{Session, SessionRegistry};

// ============================================
// CorrelationStore
// ============================================

/// Keyed persistence of sealed interactions.
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// Returns the session registered under `correlation_id`.
    ///
    /// # Errors
    /// `SessionNotFound` when no session exists.
    async fn get(&self, correlation_id: &str) -> Result<Arc<Session>>;

    /// Seals `interaction` with the session's current key and stores it.
    ///
    /// # Errors
    /// `SessionNotFound` when no session exists; the caller discards.
    async fn put(&self, correlation_id: &str, interaction: &[u8]) -> Result<()>;

    /// Stored interactions, oldest first, without removing them.
    ///
    /// # Errors
    /// `SessionNotFound` when no session exists.
    async fn list(&self, correlation_id: &str) -> Result<Vec<SealedPayload>>;

    /// Removes and returns stored interactions, oldest first.
    ///
    /// # Errors
    /// `SessionNotFound` when no session exists.
    async fn take(&self, correlation_id: &str) -> Result<Vec<SealedPayload>>;

    /// Drops orphaned buckets and items past their TTL; returns how many
    /// items were removed.
    async fn expire(&self) -> usize;
}

// ============================================
// MemoryStore
// ============================================

#[derive(Debug, Clone)]
struct StoredInteraction {
    stored_at: Instant,
    payload: SealedPayload,
}

/// In-memory [`CorrelationStore`].
pub struct MemoryStore {
    registry: Arc<SessionRegistry>,
    buckets: DashMap<CorrelationId, VecDeque<StoredInteraction>>,
    ttl: Duration,
    max_per_session: usize,
}

impl MemoryStore {
    /// Creates a store backed by `registry`.
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, ttl: Duration, max_per_session: usize) -> Self {
        Self {
            registry,
            buckets: DashMap::new(),
            ttl,
            max_per_session,
        }
    }

    /// The registry this store seals against.
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Items currently held across all sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.value().len()).sum()
    }

    /// `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CorrelationStore for MemoryStore {
    async fn get(&self, correlation_id: &str) -> Result<Arc<Session>> {
        self.registry.get_or_error(correlation_id)
    }

    async fn put(&self, correlation_id: &str, interaction: &[u8]) -> Result<()> {
        let session = self.registry.get_or_error(correlation_id)?;
        let payload = seal(&session.public_key, interaction)
            .map_err(|e| ServerError::storage(format!("sealing failed: {e}")))?;

        let mut bucket = self
            .buckets
            .entry(session.correlation_id.clone())
            .or_default();
        bucket.push_back(StoredInteraction {
            stored_at: Instant::now(),
            payload,
        });
        let mut evicted = 0usize;
        while bucket.len() > self.max_per_session {
            bucket.pop_front();
            evicted += 1;
        }
        let stored = bucket.len();
        drop(bucket);

        session.stats.record_interaction();
        debug!(
            correlation_id = %correlation_id,
            stored,
            evicted,
            "Interaction stored"
        );
        Ok(())
    }

    async fn list(&self, correlation_id: &str) -> Result<Vec<SealedPayload>> {
        self.registry.get_or_error(correlation_id)?;
        Ok(self
            .buckets
            .get(correlation_id)
            .map(|bucket| bucket.iter().map(|item| item.payload.clone()).collect())
            .unwrap_or_default())
    }

    async fn take(&self, correlation_id: &str) -> Result<Vec<SealedPayload>> {
        let session = self.registry.get_or_error(correlation_id)?;
        session.touch();

        Ok(self
            .buckets
            .remove(correlation_id)
            .map(|(_, bucket)| bucket.into_iter().map(|item| item.payload).collect())
            .unwrap_or_default())
    }

    async fn expire(&self) -> usize {
        let mut removed = 0usize;
        self.buckets.retain(|correlation_id, bucket| {
            if self.registry.get(correlation_id.as_str()).is_none() {
                removed += bucket.len();
                return false;
            }
            let before = bucket.len();
            bucket.retain(|item| item.stored_at.elapsed() < self.ttl);
            removed += before - bucket.len();
            !bucket.is_empty()
        });

        if removed > 0 {
            info!(removed, "Expired stored interactions");
        }
        removed
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("buckets", &self.buckets.len())
            .field("ttl", &self.ttl)
            .field("max_per_session", &self.max_per_session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use ooband_core::crypto::{open, ClientKeyPair};

    const CID: &str = "aaaaaaaaaaaaaaaaaaaa";

    fn setup(ttl: Duration, cap: usize) -> (MemoryStore, ClientKeyPair) {
        let registry = Arc::new(SessionRegistry::new(10, 4, Duration::from_secs(60)));
        let keys = ClientKeyPair::generate();
        registry
            .register(CID.parse().unwrap(), keys.public_key(), false, Vec::new())
            .unwrap();
        (MemoryStore::new(registry, ttl, cap), keys)
    }

    #[tokio::test]
    async fn test_put_seals_to_session_key() {
        let (store, keys) = setup(Duration::from_secs(60), 10);
        store.put(CID, br#"{"protocol":"dns"}"#).await.unwrap();

        let items = store.list(CID).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(open(&keys, &items[0]).unwrap(), br#"{"protocol":"dns"}"#);
    }

    #[tokio::test]
    async fn test_put_without_session_is_not_found() {
        let (store, _) = setup(Duration::from_secs(60), 10);
        let err = store.put("bbbbbbbbbbbbbbbbbbbb", b"{}").await.unwrap_err();
        assert!(matches!(err, ServerError::SessionNotFound { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_take_drains_in_order() {
        let (store, keys) = setup(Duration::from_secs(60), 10);
        store.put(CID, b"first").await.unwrap();
        store.put(CID, b"second").await.unwrap();

        let items = store.take(CID).await.unwrap();
        assert_eq!(open(&keys, &items[0]).unwrap(), b"first");
        assert_eq!(open(&keys, &items[1]).unwrap(), b"second");
        assert!(store.take(CID).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cap_evicts_oldest() {
        let (store, keys) = setup(Duration::from_secs(60), 2);
        for body in [&b"one"[..], b"two", b"three"] {
            store.put(CID, body).await.unwrap();
        }

        let items = store.list(CID).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(open(&keys, &items[0]).unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_reregister_seals_with_newest_key() {
        let (store, old_keys) = setup(Duration::from_secs(60), 10);
        let new_keys = ClientKeyPair::generate();
        store
            .registry()
            .register(CID.parse().unwrap(), new_keys.public_key(), false, Vec::new())
            .unwrap();

        store.put(CID, b"after").await.unwrap();
        let items = store.take(CID).await.unwrap();

        assert_eq!(open(&new_keys, &items[0]).unwrap(), b"after");
        assert!(open(&old_keys, &items[0]).is_err());
    }

    #[tokio::test]
    async fn test_expire_drops_stale_and_orphaned() {
        let (store, _) = setup(Duration::from_millis(20), 10);
        store.put(CID, b"old").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        store.put(CID, b"fresh").await.unwrap();

        assert_eq!(store.expire().await, 1);
        assert_eq!(store.len(), 1);

        store.registry().deregister(CID);
        assert_eq!(store.expire().await, 1);
        assert!(store.is_empty());
    }
}
