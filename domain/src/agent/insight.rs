//! Insight value objects - immutable findings emitted by agents.

use crate::core::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One finding produced by an agent.
///
/// Insights are immutable once produced. Emission order within a report is
/// significant and preserved through aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInsight {
    /// Short title of the finding
    pub title: String,
    /// Human-readable description
    pub description: String,
    /// Severity signal
    pub signal: Signal,
    /// Optional structured payload
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,
}

impl AgentInsight {
    /// Creates an insight with the given signal.
    pub fn new(signal: Signal, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            signal,
            data: HashMap::new(),
        }
    }

    /// Creates an informational insight.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Signal::Info, title, description)
    }

    /// Creates a warning insight.
    pub fn warn(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Signal::Warn, title, description)
    }

    /// Creates an error insight.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Signal::Error, title, description)
    }

    /// Attaches a structured data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Check if this insight carries an error signal
    pub fn is_error(&self) -> bool {
        self.signal.is_error()
    }
}
