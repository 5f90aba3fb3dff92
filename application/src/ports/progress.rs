//! Progress notification port
//!
//! Defines the interface for reporting progress during a coordinator run.

use mesh_domain::{AgentId, RunStatus};

/// Callback for progress updates during plan execution
///
/// Implementations live with the caller and can surface progress in
/// whatever way fits (console, web UI, queue events, ...).
pub trait RunProgressNotifier: Send + Sync {
    /// Called when a strategy (or an iterative round) starts
    fn on_strategy_start(&self, strategy: &str, total_agents: usize);

    /// Called when an agent invocation is dispatched
    fn on_agent_start(&self, agent: &AgentId);

    /// Called when an agent invocation finishes; `success` is false for
    /// faults, timeouts, and reports carrying an `error` insight
    fn on_agent_complete(&self, agent: &AgentId, success: bool);

    /// Called when a conditional stage is selected for execution
    fn on_stage_chosen(&self, _stage: &str) {}

    /// Called after each iterative round
    fn on_round_complete(&self, _round: usize, _converged: bool) {}

    /// Called once when the run reaches a terminal state
    fn on_strategy_complete(&self, strategy: &str, status: RunStatus);
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl RunProgressNotifier for NoProgress {
    fn on_strategy_start(&self, _strategy: &str, _total_agents: usize) {}
    fn on_agent_start(&self, _agent: &AgentId) {}
    fn on_agent_complete(&self, _agent: &AgentId, _success: bool) {}
    fn on_strategy_complete(&self, _strategy: &str, _status: RunStatus) {}
}
