//! Engine parameters — executor loop control.
//!
//! [`EngineParams`] groups the static parameters that bound execution in the
//! [`StrategyExecutor`](crate::executor::StrategyExecutor). These are
//! application-layer concerns, not domain policy; plan-level settings
//! (per-agent timeout, concurrency limit) override them where present.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Execution loop control parameters.
///
/// Controls timeouts, concurrency bounds, and the iteration ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineParams {
    /// Timeout applied around each agent invocation when the plan does not
    /// set its own.
    pub default_agent_timeout: Duration,
    /// How long a barrier waits for stragglers before releasing as partial.
    pub barrier_timeout: Duration,
    /// After a cancellation fires, how long an in-flight agent may keep
    /// running before it is treated as failed.
    pub cancellation_grace: Duration,
    /// Bound on concurrently running agents when the plan does not set one.
    /// `None` means unbounded.
    pub max_concurrency: Option<usize>,
    /// Hard ceiling on iterative rounds, applied on top of the plan's
    /// `max_rounds`.
    pub max_rounds_ceiling: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            default_agent_timeout: Duration::from_secs(60),
            barrier_timeout: Duration::from_secs(30),
            cancellation_grace: Duration::from_secs(2),
            max_concurrency: None,
            max_rounds_ceiling: 32,
        }
    }
}

impl EngineParams {
    // ==================== Builder Methods ====================

    pub fn with_default_agent_timeout(mut self, timeout: Duration) -> Self {
        self.default_agent_timeout = timeout;
        self
    }

    pub fn with_barrier_timeout(mut self, timeout: Duration) -> Self {
        self.barrier_timeout = timeout;
        self
    }

    pub fn with_cancellation_grace(mut self, grace: Duration) -> Self {
        self.cancellation_grace = grace;
        self
    }

    pub fn with_max_concurrency(mut self, max: Option<usize>) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_max_rounds_ceiling(mut self, ceiling: usize) -> Self {
        self.max_rounds_ceiling = ceiling;
        self
    }
}
