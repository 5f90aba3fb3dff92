//! Knowledge store domain types.
//!
//! The store itself (serialized mutation, TTL eviction) lives in the
//! application layer; this module defines the versioned entry, the immutable
//! snapshot used for cross-round diffing, and the store error taxonomy.

use crate::agent::value_objects::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Errors surfaced by knowledge store operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    /// Optimistic write collision: the caller's expected version is stale.
    /// The store never retries; the writing agent decides how to proceed.
    #[error("Version conflict on key '{key}': expected {expected}, current {current}")]
    VersionConflict {
        key: String,
        expected: u64,
        current: u64,
    },
}

/// A versioned fact in the shared store.
///
/// Within one coordinator run the version for a given key is strictly
/// increasing; readers always see the highest committed version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// The key this entry is stored under
    pub key: String,
    /// Opaque value
    pub value: serde_json::Value,
    /// Agent that committed this version
    pub writer: AgentId,
    /// Monotonically increasing version number (starts at 1)
    pub version: u64,
    /// Optional time-to-live in milliseconds; expired entries are lazily
    /// evicted on access
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<u64>,
}

impl KnowledgeEntry {
    pub fn new(
        key: impl Into<String>,
        value: serde_json::Value,
        writer: impl Into<AgentId>,
        version: u64,
    ) -> Self {
        Self {
            key: key.into(),
            value,
            writer: writer.into(),
            version,
            ttl_ms: None,
        }
    }

    /// Attaches a time-to-live to this entry.
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl_ms = Some(ttl_ms);
        self
    }
}

/// Immutable copy of all live entries at one point in time.
///
/// Snapshots are taken at round boundaries so the refinement loop can diff
/// consecutive rounds without holding the store lock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    entries: HashMap<String, KnowledgeEntry>,
}

impl KnowledgeSnapshot {
    /// Creates a snapshot from a set of entries.
    pub fn new(entries: HashMap<String, KnowledgeEntry>) -> Self {
        Self { entries }
    }

    /// Creates an empty snapshot (state before the first round).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Looks up an entry by key.
    pub fn get(&self, key: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the snapshot holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &KnowledgeEntry)> {
        self.entries.iter()
    }

    /// Keys whose value changed between `prior` and `self`.
    ///
    /// A key counts as changed if it was added, removed, or re-versioned.
    /// The result is sorted for stable reporting.
    pub fn changed_keys(&self, prior: &KnowledgeSnapshot) -> Vec<String> {
        let mut changed = BTreeSet::new();

        for (key, entry) in &self.entries {
            match prior.entries.get(key) {
                Some(prev) if prev.version == entry.version => {}
                _ => {
                    changed.insert(key.clone());
                }
            }
        }
        for key in prior.entries.keys() {
            if !self.entries.contains_key(key) {
                changed.insert(key.clone());
            }
        }

        changed.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, u64)]) -> KnowledgeSnapshot {
        let map = entries
            .iter()
            .map(|(k, v)| {
                (
                    k.to_string(),
                    KnowledgeEntry::new(*k, serde_json::json!("x"), "writer", *v),
                )
            })
            .collect();
        KnowledgeSnapshot::new(map)
    }

    #[test]
    fn test_changed_keys_detects_new_and_reversioned() {
        let prior = snapshot(&[("a", 1), ("b", 2)]);
        let current = snapshot(&[("a", 1), ("b", 3), ("c", 1)]);

        assert_eq!(current.changed_keys(&prior), vec!["b", "c"]);
    }

    #[test]
    fn test_changed_keys_detects_removed() {
        let prior = snapshot(&[("a", 1), ("b", 1)]);
        let current = snapshot(&[("a", 1)]);

        assert_eq!(current.changed_keys(&prior), vec!["b"]);
    }

    #[test]
    fn test_changed_keys_empty_when_identical() {
        let prior = snapshot(&[("a", 1)]);
        let current = snapshot(&[("a", 1)]);

        assert!(current.changed_keys(&prior).is_empty());
    }

    #[test]
    fn test_version_conflict_display() {
        let err = KnowledgeError::VersionConflict {
            key: "scan.result".to_string(),
            expected: 2,
            current: 5,
        };
        assert_eq!(
            err.to_string(),
            "Version conflict on key 'scan.result': expected 2, current 5"
        );
    }
}
