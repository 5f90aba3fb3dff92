//! Strategy executor - the state machine driving agents through a plan.
//!
//! A run moves `Pending → Running → {Completed, Failed}`. The executor owns
//! the per-invocation machinery shared by all strategies: timeout
//! enforcement, fault-to-insight conversion, and cancellation handling.
//! Strategy-specific transition logic lives in the sibling modules
//! ([`parallel`], [`conditional`]); iterative convergence is owned by the
//! [`refinement`] loop, the executor only runs one round at a time.

pub mod conditional;
pub mod parallel;
pub mod refinement;

use crate::config::EngineParams;
use crate::knowledge::{KnowledgeHandle, KnowledgeStore};
use crate::ports::agent::Agent;
use crate::ports::progress::RunProgressNotifier;
use crate::registry::AgentRegistry;
use mesh_domain::{
    AgentContext, AgentId, AgentInsight, AgentReport, ExecutionPlan, RunStatus, Strategy,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How one agent invocation ended.
///
/// Distinguishes a normal return (even one carrying `error` insights) from
/// a failure the executor had to synthesize a report for; the distinction
/// drives barrier arrival bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvocationEnd {
    /// The agent returned its own report
    Returned,
    /// Fault, panic, timeout, or unresponsive to cancellation
    Failed,
}

/// Result of executing one strategy (or one iterative round).
#[derive(Debug)]
pub struct RoundOutcome {
    /// Collected reports, including executor-synthesized ones for failures
    pub reports: Vec<AgentReport>,
    /// Terminal state of this round
    pub status: RunStatus,
    /// Stages that actually ran (conditional strategies only)
    pub chosen_path: Vec<String>,
}

impl RoundOutcome {
    /// Highest severity signal across all collected reports.
    pub fn signal(&self) -> mesh_domain::Signal {
        self.reports
            .iter()
            .map(|r| r.signal())
            .fold(mesh_domain::Signal::Info, mesh_domain::Signal::escalate)
    }
}

/// Drives the agents of one run through the plan's strategy.
pub struct StrategyExecutor {
    registry: AgentRegistry,
    params: EngineParams,
}

impl StrategyExecutor {
    pub fn new(registry: AgentRegistry, params: EngineParams) -> Self {
        Self { registry, params }
    }

    pub(crate) fn params(&self) -> &EngineParams {
        &self.params
    }

    pub(crate) fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Effective per-agent timeout: plan setting, or the engine default.
    pub(crate) fn agent_timeout(&self, plan: &ExecutionPlan) -> Duration {
        plan.agent_timeout
            .unwrap_or(self.params.default_agent_timeout)
    }

    /// Execute one strategy to its terminal state.
    ///
    /// For an iterative strategy this executes a single round of the inner
    /// strategy; round sequencing and convergence belong to
    /// [`refinement::RefinementLoop`].
    pub async fn run_strategy(
        &self,
        strategy: &Strategy,
        plan: &ExecutionPlan,
        ctx: Arc<AgentContext>,
        store: &KnowledgeStore,
        cancel: &CancellationToken,
        progress: &dyn RunProgressNotifier,
    ) -> RoundOutcome {
        progress.on_strategy_start(strategy.name(), strategy.referenced_agents().len());
        info!(
            strategy = strategy.name(),
            agents = strategy.referenced_agents().len(),
            "executing strategy"
        );

        match strategy {
            Strategy::Sequential { agents } => {
                self.run_sequential(agents, plan, ctx, store, cancel, progress)
                    .await
            }
            Strategy::Parallel {
                agents,
                max_concurrency,
            } => {
                self.run_parallel(agents, *max_concurrency, plan, ctx, store, cancel, progress)
                    .await
            }
            Strategy::Conditional { stages } => {
                self.run_conditional(stages, plan, ctx, store, cancel, progress)
                    .await
            }
            Strategy::Iterative { inner, .. } => {
                Box::pin(self.run_strategy(inner, plan, ctx, store, cancel, progress)).await
            }
        }
    }

    /// Sequential mode: agents run one at a time in plan order. Later agents
    /// see predecessors' knowledge writes through the store, not through the
    /// (immutable) context.
    async fn run_sequential(
        &self,
        agents: &[AgentId],
        plan: &ExecutionPlan,
        ctx: Arc<AgentContext>,
        store: &KnowledgeStore,
        cancel: &CancellationToken,
        progress: &dyn RunProgressNotifier,
    ) -> RoundOutcome {
        let timeout = self.agent_timeout(plan);
        let fail_fast = plan.failure_policy.is_fail_fast();

        let mut reports = Vec::new();
        let mut status = RunStatus::Completed;

        for id in agents {
            if cancel.is_cancelled() {
                debug!("sequential run cancelled before agent '{}'", id);
                status = RunStatus::Failed;
                break;
            }

            progress.on_agent_start(id);
            let (report, _end) = self
                .invoke_registered(id, Arc::clone(&ctx), store, cancel, timeout)
                .await;

            let errored = report.has_error();
            progress.on_agent_complete(id, !errored);
            reports.push(report);

            if errored && fail_fast {
                warn!("fail-fast tripped by agent '{}'; skipping remainder", id);
                status = RunStatus::Failed;
                break;
            }
        }

        RoundOutcome {
            reports,
            status,
            chosen_path: Vec::new(),
        }
    }

    /// Invoke one registered agent with the full failure envelope applied.
    pub(crate) async fn invoke_registered(
        &self,
        id: &AgentId,
        ctx: Arc<AgentContext>,
        store: &KnowledgeStore,
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> (AgentReport, InvocationEnd) {
        match self.registry.resolve(id) {
            Some(agent) => {
                invoke_agent(
                    agent,
                    id.clone(),
                    ctx,
                    store.handle(id.clone()),
                    cancel.clone(),
                    timeout,
                    self.params.cancellation_grace,
                )
                .await
            }
            // Validation rejects unregistered ids before execution; an id
            // disappearing mid-run still must not crash the run.
            None => (
                failure_report(id, "agent not registered", format!("no agent '{}'", id)),
                InvocationEnd::Failed,
            ),
        }
    }
}

/// Invoke one agent, converting every failure mode into an `error` insight:
/// fault and panic become "agent fault", exceeding `timeout` becomes
/// "agent timed out", and ignoring a cancellation beyond `grace` becomes
/// "agent unresponsive". The agent future runs on its own task so a panic
/// is contained per agent.
pub(crate) async fn invoke_agent(
    agent: Arc<dyn Agent>,
    id: AgentId,
    ctx: Arc<AgentContext>,
    knowledge: KnowledgeHandle,
    cancel: CancellationToken,
    timeout: Duration,
    grace: Duration,
) -> (AgentReport, InvocationEnd) {
    let run_cancel = cancel.clone();
    let mut task = tokio::spawn(async move { agent.run(ctx, knowledge, run_cancel).await });

    tokio::select! {
        joined = &mut task => match joined {
            Ok(Ok(report)) => (report, InvocationEnd::Returned),
            Ok(Err(fault)) => {
                warn!("agent '{}' faulted: {}", id, fault);
                (
                    failure_report(&id, "agent fault", fault.to_string()),
                    InvocationEnd::Failed,
                )
            }
            Err(join_error) => {
                warn!("agent '{}' panicked: {}", id, join_error);
                (
                    failure_report(&id, "agent fault", format!("agent panicked: {}", join_error)),
                    InvocationEnd::Failed,
                )
            }
        },
        _ = tokio::time::sleep(timeout) => {
            task.abort();
            warn!("agent '{}' exceeded timeout of {:?}", id, timeout);
            (
                failure_report(
                    &id,
                    "agent timed out",
                    format!("no report within {:?}", timeout),
                ),
                InvocationEnd::Failed,
            )
        },
        _ = cancelled_beyond_grace(&cancel, grace) => {
            task.abort();
            warn!("agent '{}' unresponsive to cancellation", id);
            (
                failure_report(
                    &id,
                    "agent unresponsive",
                    format!("ignored cancellation for {:?}", grace),
                ),
                InvocationEnd::Failed,
            )
        },
    }
}

/// Resolves once the token has been cancelled for at least `grace`.
async fn cancelled_beyond_grace(cancel: &CancellationToken, grace: Duration) {
    cancel.cancelled().await;
    tokio::time::sleep(grace).await;
}

/// Synthesize the report the executor files on behalf of a failed agent.
pub(crate) fn failure_report(
    id: &AgentId,
    title: &str,
    description: String,
) -> AgentReport {
    AgentReport::new(id.clone()).with_insight(AgentInsight::error(title, description))
}
