//! Agent contract port.
//!
//! Defines the single capability every participant must expose: given the
//! run context, produce a report. Implementations live with the caller
//! (security scanners, scaling advisors, feedback analyzers, ...); the
//! engine only sees this trait.

use crate::knowledge::KnowledgeHandle;
use async_trait::async_trait;
use mesh_domain::{AgentContext, AgentId, AgentReport};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Catastrophic agent failure.
///
/// Returned when an implementation cannot produce a report at all. The
/// executor converts a fault into an `error`-signal insight; it never
/// propagates as a process-level failure. Recoverable problems should
/// instead be reported as `error` insights inside a normal report.
#[derive(Error, Debug)]
pub enum AgentFault {
    #[error("Agent implementation failed: {0}")]
    Internal(String),

    #[error("Required resource unavailable: {0}")]
    ResourceUnavailable(String),
}

impl AgentFault {
    /// Shorthand for an internal fault with a message.
    pub fn internal(message: impl Into<String>) -> Self {
        AgentFault::Internal(message.into())
    }
}

/// The capability contract every agent unit implements.
///
/// Contract obligations:
/// - honor the cancellation token and return promptly (a partial report is
///   fine); the executor enforces a timeout around every invocation
/// - never mutate the shared [`AgentContext`]
/// - knowledge exchange goes through the supplied [`KnowledgeHandle`] only;
///   agents must not share raw state with each other
/// - safe to invoke concurrently with other agents
#[async_trait]
pub trait Agent: Send + Sync {
    /// The identifier this agent is registered under.
    fn id(&self) -> AgentId;

    /// Execute one invocation and return the findings.
    async fn run(
        &self,
        ctx: Arc<AgentContext>,
        knowledge: KnowledgeHandle,
        cancel: CancellationToken,
    ) -> Result<AgentReport, AgentFault>;
}
