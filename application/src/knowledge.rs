//! Run-scoped knowledge store.
//!
//! The shared blackboard agents use to exchange intermediate findings within
//! one coordinator run. All mutation is serialized through one async lock, so
//! readers never observe a partially applied write; concurrent same-key
//! writes resolve as last-committed-wins with the per-key version counter
//! bumped exactly once per successful write. Entries tagged with a
//! time-to-live are lazily evicted on access.
//!
//! Agents receive a [`KnowledgeHandle`] carrying their identity, so every
//! write is attributed; the handle is scoped to the current run only.

use mesh_domain::{AgentId, KnowledgeEntry, KnowledgeError, KnowledgeSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Slot {
    entry: KnowledgeEntry,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct StoreInner {
    slots: HashMap<String, Slot>,
    /// Per-key version counters. Never reset, even after TTL eviction,
    /// so versions stay strictly increasing for the life of the run.
    versions: HashMap<String, u64>,
}

impl StoreInner {
    fn evict_expired(&mut self, now: Instant) {
        self.slots
            .retain(|_, slot| slot.expires_at.is_none_or(|deadline| deadline > now));
    }

    fn commit(
        &mut self,
        key: String,
        value: serde_json::Value,
        writer: AgentId,
        ttl: Option<Duration>,
    ) -> u64 {
        let version = self
            .versions
            .entry(key.clone())
            .and_modify(|v| *v += 1)
            .or_insert(1);
        let version = *version;

        let mut entry = KnowledgeEntry::new(key.clone(), value, writer, version);
        if let Some(ttl) = ttl {
            entry = entry.with_ttl_ms(ttl.as_millis() as u64);
        }
        self.slots.insert(
            key,
            Slot {
                entry,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        version
    }
}

/// Shared, versioned key-value store for one coordinator run.
///
/// Cheap to clone; all clones share the same state. Created by the
/// coordinator at run start and discarded with the run.
#[derive(Clone, Default)]
pub struct KnowledgeStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a new version for `key` and return the version number.
    pub async fn put(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        writer: &AgentId,
    ) -> u64 {
        let mut inner = self.inner.lock().await;
        inner.commit(key.into(), value, writer.clone(), None)
    }

    /// Like [`put`](Self::put), with a time-to-live after which the entry
    /// is evicted on access.
    pub async fn put_with_ttl(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        writer: &AgentId,
        ttl: Duration,
    ) -> u64 {
        let mut inner = self.inner.lock().await;
        inner.commit(key.into(), value, writer.clone(), Some(ttl))
    }

    /// Optimistic write: commit only if the caller's `expected` version is
    /// still current (0 for "key absent"). On a stale expectation, fails
    /// with [`KnowledgeError::VersionConflict`]. The store never retries;
    /// the caller decides whether to retry or abort.
    pub async fn put_if_version(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        writer: &AgentId,
        expected: u64,
    ) -> Result<u64, KnowledgeError> {
        let key = key.into();
        let mut inner = self.inner.lock().await;
        inner.evict_expired(Instant::now());

        let current = inner.slots.get(&key).map(|s| s.entry.version).unwrap_or(0);
        if current != expected {
            return Err(KnowledgeError::VersionConflict {
                key,
                expected,
                current,
            });
        }
        Ok(inner.commit(key, value, writer.clone(), None))
    }

    /// Most recent value and version for `key`, or `None` if absent or
    /// expired.
    pub async fn get(&self, key: &str) -> Option<(serde_json::Value, u64)> {
        let mut inner = self.inner.lock().await;
        inner.evict_expired(Instant::now());
        inner
            .slots
            .get(key)
            .map(|slot| (slot.entry.value.clone(), slot.entry.version))
    }

    /// Immutable copy of all live entries, for cross-round diffing.
    pub async fn snapshot(&self) -> KnowledgeSnapshot {
        let mut inner = self.inner.lock().await;
        inner.evict_expired(Instant::now());
        let entries = inner
            .slots
            .iter()
            .map(|(key, slot)| (key.clone(), slot.entry.clone()))
            .collect();
        KnowledgeSnapshot::new(entries)
    }

    /// Create the handle passed to one agent, attributing its writes.
    pub fn handle(&self, agent: AgentId) -> KnowledgeHandle {
        KnowledgeHandle {
            store: self.clone(),
            agent,
        }
    }
}

/// Per-agent view of the run's knowledge store.
///
/// Carries the agent's identity so writes are attributed without the agent
/// having to pass it on every call.
#[derive(Clone)]
pub struct KnowledgeHandle {
    store: KnowledgeStore,
    agent: AgentId,
}

impl KnowledgeHandle {
    /// The agent this handle writes as.
    pub fn agent(&self) -> &AgentId {
        &self.agent
    }

    /// Commit a new version for `key` and return the version number.
    pub async fn put(&self, key: impl Into<String>, value: serde_json::Value) -> u64 {
        self.store.put(key, value, &self.agent).await
    }

    /// Commit with a time-to-live.
    pub async fn put_with_ttl(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        ttl: Duration,
    ) -> u64 {
        self.store.put_with_ttl(key, value, &self.agent, ttl).await
    }

    /// Optimistic write; see [`KnowledgeStore::put_if_version`].
    pub async fn put_if_version(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
        expected: u64,
    ) -> Result<u64, KnowledgeError> {
        self.store
            .put_if_version(key, value, &self.agent, expected)
            .await
    }

    /// Most recent value and version for `key`.
    pub async fn get(&self, key: &str) -> Option<(serde_json::Value, u64)> {
        self.store.get(key).await
    }
}
