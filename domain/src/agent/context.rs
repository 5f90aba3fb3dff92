//! Run context shared with every participating agent.

use super::value_objects::{RunId, current_timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Immutable per-run input handed to every agent.
///
/// Created once by the caller, shared by reference (`Arc<AgentContext>`)
/// across all agents in one run, never mutated after creation. The builder
/// methods consume `self` and are only usable before the context is shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    /// Unique identifier of this run
    pub run_id: RunId,
    /// Creation timestamp (milliseconds since epoch)
    pub created_at: u64,
    /// Arbitrary caller-supplied payload
    pub payload: HashMap<String, serde_json::Value>,
}

impl AgentContext {
    /// Creates a context with a freshly generated run id and empty payload.
    pub fn new() -> Self {
        Self {
            run_id: RunId::generate(),
            created_at: current_timestamp(),
            payload: HashMap::new(),
        }
    }

    /// Creates a context with an explicit run id.
    pub fn with_run_id(run_id: impl Into<RunId>) -> Self {
        Self {
            run_id: run_id.into(),
            created_at: current_timestamp(),
            payload: HashMap::new(),
        }
    }

    /// Adds a payload entry.
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }

    /// Looks up a payload entry by key.
    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.payload.get(key)
    }
}

impl Default for AgentContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_generates_run_id() {
        let ctx = AgentContext::new();
        assert!(!ctx.run_id.as_str().is_empty());
        assert!(ctx.created_at > 0);
    }

    #[test]
    fn test_context_payload_lookup() {
        let ctx = AgentContext::with_run_id("run-7")
            .with_value("target", serde_json::json!("api-service"))
            .with_value("depth", serde_json::json!(3));

        assert_eq!(ctx.run_id.as_str(), "run-7");
        assert_eq!(ctx.value("target"), Some(&serde_json::json!("api-service")));
        assert_eq!(ctx.value("depth"), Some(&serde_json::json!(3)));
        assert!(ctx.value("missing").is_none());
    }
}
