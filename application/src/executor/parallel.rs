//! Parallel strategy execution.
//!
//! All agents launch concurrently (bounded by the optional concurrency
//! limit) and rendezvous at a single barrier. Fail-fast cancellation is
//! cooperative: the first `error` insight cancels a group-scoped child
//! token; agents that observe it return promptly with partial reports,
//! agents that ignore it are treated as failed after the grace period.

use super::{InvocationEnd, RoundOutcome, StrategyExecutor, failure_report, invoke_agent};
use crate::knowledge::KnowledgeStore;
use crate::ports::progress::RunProgressNotifier;
use crate::sync::barrier::{Barrier, BarrierOutcome};
use mesh_domain::{AgentContext, AgentId, AgentReport, ExecutionPlan, RunStatus};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Result of one concurrent agent group (a full parallel strategy or a
/// single conditional stage).
pub(crate) struct GroupResult {
    pub reports: Vec<AgentReport>,
    /// Whether the barrier released by completion rather than timeout
    pub complete: bool,
}

impl GroupResult {
    pub(crate) fn has_error(&self) -> bool {
        self.reports.iter().any(|r| r.has_error())
    }
}

impl StrategyExecutor {
    pub(crate) async fn run_parallel(
        &self,
        agents: &[AgentId],
        max_concurrency: Option<usize>,
        plan: &ExecutionPlan,
        ctx: Arc<AgentContext>,
        store: &KnowledgeStore,
        cancel: &CancellationToken,
        progress: &dyn RunProgressNotifier,
    ) -> RoundOutcome {
        let group = self
            .run_group(agents, max_concurrency, plan, ctx, store, cancel, progress)
            .await;

        let fail_fast_tripped = plan.failure_policy.is_fail_fast() && group.has_error();
        let status = if !group.complete || cancel.is_cancelled() || fail_fast_tripped {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };

        RoundOutcome {
            reports: group.reports,
            status,
            chosen_path: Vec::new(),
        }
    }

    /// Launch one group of agents concurrently and collect their reports.
    ///
    /// Every spawned task arrives at the barrier exactly once: normally on
    /// return, via `arrive_with_failure` when the invocation ended in a
    /// fault or timeout. Invocations are individually time-bounded, so the
    /// drain after barrier release finishes within the grace period.
    pub(crate) async fn run_group(
        &self,
        agents: &[AgentId],
        max_concurrency: Option<usize>,
        plan: &ExecutionPlan,
        ctx: Arc<AgentContext>,
        store: &KnowledgeStore,
        cancel: &CancellationToken,
        progress: &dyn RunProgressNotifier,
    ) -> GroupResult {
        let timeout = self.agent_timeout(plan);
        let grace = self.params().cancellation_grace;
        let fail_fast = plan.failure_policy.is_fail_fast();

        let barrier = Arc::new(Barrier::new(
            agents.iter().cloned(),
            self.params().barrier_timeout,
        ));
        let limit = max_concurrency.or(self.params().max_concurrency);
        let semaphore = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        let group_cancel = cancel.child_token();

        let mut join_set: JoinSet<(AgentId, AgentReport)> = JoinSet::new();

        for id in agents {
            progress.on_agent_start(id);

            let agent = self.registry().resolve(id);
            let id = id.clone();
            let ctx = Arc::clone(&ctx);
            let knowledge = store.handle(id.clone());
            let barrier = Arc::clone(&barrier);
            let semaphore = semaphore.clone();
            let token = group_cancel.clone();

            join_set.spawn(async move {
                let _permit = match semaphore {
                    Some(s) => s.acquire_owned().await.ok(),
                    None => None,
                };

                let (report, end) = match agent {
                    Some(agent) => {
                        invoke_agent(agent, id.clone(), ctx, knowledge, token.clone(), timeout, grace)
                            .await
                    }
                    None => (
                        failure_report(&id, "agent not registered", format!("no agent '{}'", id)),
                        InvocationEnd::Failed,
                    ),
                };

                match end {
                    InvocationEnd::Returned => barrier.arrive(&id),
                    InvocationEnd::Failed => barrier.arrive_with_failure(&id),
                }

                if fail_fast && report.has_error() {
                    debug!("fail-fast: agent '{}' errored, cancelling group", id);
                    token.cancel();
                }

                (id, report)
            });
        }

        let outcome = barrier.wait().await;
        if let BarrierOutcome::TimedOut { missing, .. } = &outcome {
            warn!(
                "barrier timed out after {:?}; missing: {}",
                self.params().barrier_timeout,
                missing
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            group_cancel.cancel();
        }

        let mut reports = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((id, report)) => {
                    progress.on_agent_complete(&id, !report.has_error());
                    reports.push(report);
                }
                Err(join_error) => {
                    warn!("agent task join error: {}", join_error);
                }
            }
        }

        GroupResult {
            reports,
            complete: outcome.is_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ScriptedAgent, executor_with, run};
    use mesh_domain::{AgentId, ExecutionPlan, FailurePolicy, RunStatus, Signal};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_succeed_releases_by_completion() {
        let executor = executor_with(vec![
            ScriptedAgent::ok("a"),
            ScriptedAgent::ok("b"),
            ScriptedAgent::ok("c"),
        ]);
        let plan = ExecutionPlan::parallel(["a", "b", "c"]);

        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.reports.len(), 3);
        assert_eq!(outcome.signal(), Signal::Info);
    }

    #[tokio::test]
    async fn test_concurrency_limit_still_completes() {
        let executor = executor_with(vec![
            ScriptedAgent::slow("a", Duration::from_millis(20)),
            ScriptedAgent::slow("b", Duration::from_millis(20)),
            ScriptedAgent::slow("c", Duration::from_millis(20)),
            ScriptedAgent::slow("d", Duration::from_millis(20)),
        ]);
        let mut plan = ExecutionPlan::parallel(["a", "b", "c", "d"]);
        if let mesh_domain::Strategy::Parallel {
            max_concurrency, ..
        } = &mut plan.strategy
        {
            *max_concurrency = Some(2);
        }

        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.reports.len(), 4);
    }

    #[tokio::test]
    async fn test_fault_arrives_with_failure_and_run_completes() {
        // A faulted agent must not hang the barrier; under collect-all the
        // run still completes with the synthesized error insight.
        let executor = executor_with(vec![
            ScriptedAgent::ok("healthy"),
            ScriptedAgent::faulting("crashy"),
        ]);
        let plan = ExecutionPlan::parallel(["healthy", "crashy"]);

        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.signal(), Signal::Error);
    }

    #[tokio::test]
    async fn test_fail_fast_cancels_in_flight_agents() {
        let executor = executor_with(vec![
            ScriptedAgent::erroring("tripwire"),
            ScriptedAgent::slow("steady", Duration::from_secs(30)),
        ]);
        let plan = ExecutionPlan::parallel(["tripwire", "steady"])
            .with_failure_policy(FailurePolicy::FailFast)
            .with_agent_timeout(Duration::from_secs(60));

        let started = std::time::Instant::now();
        let outcome = run(&executor, &plan).await;

        // The slow agent observed the cancellation and returned a partial
        // report well before its own 30s sleep or the 60s timeout.
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.reports.len(), 2);

        let steady = outcome
            .reports
            .iter()
            .find(|r| r.agent == AgentId::new("steady"))
            .unwrap();
        assert_eq!(steady.insights[0].title, "cancelled");
    }

    #[tokio::test]
    async fn test_barrier_timeout_fails_run_with_partial_reports() {
        // Agent ignores cancellation and outlives the barrier timeout; the
        // run fails but still carries a report for every participant.
        let executor = executor_with(vec![
            ScriptedAgent::ok("prompt"),
            ScriptedAgent {
                respect_cancel: false,
                ..ScriptedAgent::slow("straggler", Duration::from_secs(30))
            },
        ]);
        let plan = ExecutionPlan::parallel(["prompt", "straggler"])
            .with_agent_timeout(Duration::from_secs(60));

        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.reports.len(), 2);

        let straggler = outcome
            .reports
            .iter()
            .find(|r| r.agent == AgentId::new("straggler"))
            .unwrap();
        assert!(straggler.has_error());
    }

    #[tokio::test]
    async fn test_concurrent_knowledge_writes_all_commit() {
        use crate::knowledge::KnowledgeStore;
        use crate::ports::progress::NoProgress;
        use mesh_domain::AgentContext;
        use std::sync::Arc;
        use tokio_util::sync::CancellationToken;

        let executor = executor_with(vec![
            ScriptedAgent::writing("w1", "shared", serde_json::json!("one")),
            ScriptedAgent::writing("w2", "shared", serde_json::json!("two")),
        ]);
        let plan = ExecutionPlan::parallel(["w1", "w2"]);

        let store = KnowledgeStore::new();
        let outcome = executor
            .run_strategy(
                &plan.strategy,
                &plan,
                Arc::new(AgentContext::new()),
                &store,
                &CancellationToken::new(),
                &NoProgress,
            )
            .await;

        assert_eq!(outcome.status, RunStatus::Completed);
        // Last-committed-wins: exactly two versions, final value intact
        let (value, version) = store.get("shared").await.unwrap();
        assert_eq!(version, 2);
        assert!(value == serde_json::json!("one") || value == serde_json::json!("two"));
    }
}
