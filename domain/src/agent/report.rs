//! Per-agent report produced by one invocation.

use super::insight::AgentInsight;
use super::value_objects::{AgentId, current_timestamp};
use crate::core::signal::Signal;
use serde::{Deserialize, Serialize};

/// Output of a single agent invocation.
///
/// Insights keep their emission order. Once collected by the executor the
/// report is owned by the aggregation step; the producing agent relinquishes
/// it on return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    /// The agent that produced this report
    pub agent: AgentId,
    /// Findings in emission order
    pub insights: Vec<AgentInsight>,
    /// Completion timestamp (milliseconds since epoch)
    pub completed_at: u64,
}

impl AgentReport {
    /// Creates an empty report for the given agent, stamped now.
    pub fn new(agent: impl Into<AgentId>) -> Self {
        Self {
            agent: agent.into(),
            insights: Vec::new(),
            completed_at: current_timestamp(),
        }
    }

    /// Appends an insight, preserving emission order.
    pub fn push(&mut self, insight: AgentInsight) {
        self.insights.push(insight);
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_insight(mut self, insight: AgentInsight) -> Self {
        self.insights.push(insight);
        self
    }

    /// Highest severity signal in this report (`Info` for an empty report).
    pub fn signal(&self) -> Signal {
        self.insights
            .iter()
            .map(|i| i.signal)
            .fold(Signal::Info, Signal::escalate)
    }

    /// Check if any insight carries an error signal
    pub fn has_error(&self) -> bool {
        self.insights.iter().any(|i| i.is_error())
    }
}
