//! Run Plan use case.
//!
//! The public entry point of the engine: accepts an execution plan, selects
//! the strategy, and returns the aggregated report. Configuration errors
//! (unregistered agent, malformed plan) are the only `Err` results; a run
//! that fails mid-flight still returns a structured report with
//! `status: Failed` carrying whatever insights were gathered.

use crate::config::EngineParams;
use crate::executor::refinement::RefinementLoop;
use crate::executor::{RoundOutcome, StrategyExecutor};
use crate::knowledge::KnowledgeStore;
use crate::ports::progress::{NoProgress, RunProgressNotifier};
use crate::ports::run_archive::{ArchiveEvent, NoArchive, RunArchive};
use crate::registry::AgentRegistry;
use mesh_domain::{
    AgentContext, AggregatedReport, DomainError, ExecutionPlan, RunStatus, Strategy,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors that reject a run before any agent executes
#[derive(Error, Debug)]
pub enum RunPlanError {
    #[error("Invalid execution plan: {0}")]
    InvalidPlan(#[from] DomainError),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RunPlanError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunPlanError::Cancelled)
    }
}

/// Input for the RunPlan use case
#[derive(Clone)]
pub struct RunPlanInput {
    /// Immutable run context shared by reference with every agent
    pub context: Arc<AgentContext>,
    /// The plan to execute
    pub plan: ExecutionPlan,
}

impl RunPlanInput {
    pub fn new(context: AgentContext, plan: ExecutionPlan) -> Self {
        Self {
            context: Arc::new(context),
            plan,
        }
    }
}

/// Counters accumulated across runs of one use case instance.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub agents_invoked: u64,
    pub insights_collected: u64,
}

/// Use case for executing a coordination plan end to end.
pub struct RunPlanUseCase {
    registry: AgentRegistry,
    params: EngineParams,
    archive: Arc<dyn RunArchive>,
    cancellation_token: Option<CancellationToken>,
    stats: Mutex<RunStats>,
}

impl RunPlanUseCase {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry,
            params: EngineParams::default(),
            archive: Arc::new(NoArchive),
            cancellation_token: None,
            stats: Mutex::new(RunStats::default()),
        }
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn RunArchive>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> RunStats {
        *self.stats.lock().expect("stats lock poisoned")
    }

    /// Execute the plan with default (no-op) progress.
    pub async fn execute(
        &self,
        input: RunPlanInput,
    ) -> Result<AggregatedReport, RunPlanError> {
        self.execute_with_progress(input, &NoProgress).await
    }

    /// Execute the plan with progress callbacks.
    pub async fn execute_with_progress(
        &self,
        input: RunPlanInput,
        progress: &dyn RunProgressNotifier,
    ) -> Result<AggregatedReport, RunPlanError> {
        let cancel = self
            .cancellation_token
            .clone()
            .unwrap_or_default();
        if cancel.is_cancelled() {
            return Err(RunPlanError::Cancelled);
        }

        // Reject configuration errors before any agent executes
        input.plan.validate(&self.registry.registered_ids())?;

        let plan = &input.plan;
        let strategy_name = plan.strategy.name();
        info!(
            run_id = %input.context.run_id,
            plan_id = %plan.id,
            strategy = strategy_name,
            "starting run"
        );
        {
            let mut stats = self.stats.lock().expect("stats lock poisoned");
            stats.runs_started += 1;
        }
        self.archive.record(ArchiveEvent::new(
            "run_started",
            serde_json::json!({
                "run_id": input.context.run_id,
                "plan_id": plan.id,
                "strategy": strategy_name,
            }),
        ));

        // The store lives exactly as long as the run; no cross-run leakage
        let store = KnowledgeStore::new();
        let executor = StrategyExecutor::new(self.registry.clone(), self.params.clone());

        let report = match &plan.strategy {
            Strategy::Iterative {
                inner,
                max_rounds,
                convergence,
            } => {
                let outcome = RefinementLoop::new(&executor)
                    .run(
                        inner,
                        *max_rounds,
                        *convergence,
                        plan,
                        Arc::clone(&input.context),
                        &store,
                        &cancel,
                        progress,
                    )
                    .await;

                AggregatedReport::aggregate(
                    plan.id.clone(),
                    strategy_name,
                    outcome.status,
                    &plan.strategy.plan_positions(),
                    outcome.last_reports,
                )
                .with_rounds(outcome.rounds, outcome.converged)
            }
            _ => {
                let RoundOutcome {
                    reports,
                    status,
                    chosen_path,
                } = executor
                    .run_strategy(
                        &plan.strategy,
                        plan,
                        Arc::clone(&input.context),
                        &store,
                        &cancel,
                        progress,
                    )
                    .await;

                AggregatedReport::aggregate(
                    plan.id.clone(),
                    strategy_name,
                    status,
                    &plan.strategy.plan_positions(),
                    reports,
                )
                .with_chosen_path(chosen_path)
            }
        };

        self.finish(&input, &report, progress);
        Ok(report)
    }

    fn finish(
        &self,
        input: &RunPlanInput,
        report: &AggregatedReport,
        progress: &dyn RunProgressNotifier,
    ) {
        let invoked: u64 = if report.rounds.is_empty() {
            report.sub_reports.len() as u64
        } else {
            report.rounds.iter().map(|r| r.reports.len() as u64).sum()
        };

        {
            let mut stats = self.stats.lock().expect("stats lock poisoned");
            match report.status {
                RunStatus::Completed => stats.runs_completed += 1,
                RunStatus::Failed => stats.runs_failed += 1,
            }
            stats.agents_invoked += invoked;
            stats.insights_collected += report.insights.len() as u64;
        }

        for sub in &report.sub_reports {
            self.archive.record(ArchiveEvent::new(
                "agent_completed",
                serde_json::json!({
                    "run_id": input.context.run_id,
                    "agent": sub.agent,
                    "signal": sub.signal(),
                    "insights": sub.insights.len(),
                }),
            ));
        }
        self.archive.record(ArchiveEvent::new(
            "run_finished",
            serde_json::json!({
                "run_id": input.context.run_id,
                "plan_id": report.plan_id,
                "status": report.status,
                "overall": report.overall,
                "insights": report.insights.len(),
                "rounds": report.round_count(),
                "converged": report.converged,
            }),
        ));

        match report.status {
            RunStatus::Completed => info!(
                run_id = %input.context.run_id,
                overall = %report.overall,
                insights = report.insights.len(),
                "run completed"
            ),
            RunStatus::Failed => warn!(
                run_id = %input.context.run_id,
                overall = %report.overall,
                insights = report.insights.len(),
                "run failed"
            ),
        }
        progress.on_strategy_complete(&report.strategy, report.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeHandle;
    use crate::ports::agent::{Agent, AgentFault};
    use async_trait::async_trait;
    use mesh_domain::{
        AgentId, AgentInsight, AgentReport, FailurePolicy, Signal,
    };

    struct StubAgent {
        id: &'static str,
        signal: Signal,
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn id(&self) -> AgentId {
            AgentId::new(self.id)
        }

        async fn run(
            &self,
            _ctx: Arc<AgentContext>,
            _knowledge: KnowledgeHandle,
            _cancel: CancellationToken,
        ) -> Result<AgentReport, AgentFault> {
            Ok(AgentReport::new(self.id)
                .with_insight(AgentInsight::new(self.signal, "finding", "details")))
        }
    }

    fn use_case(agents: Vec<StubAgent>) -> RunPlanUseCase {
        let mut registry = AgentRegistry::new();
        for agent in agents {
            registry.register(Arc::new(agent));
        }
        RunPlanUseCase::new(registry)
    }

    fn info_agent(id: &'static str) -> StubAgent {
        StubAgent {
            id,
            signal: Signal::Info,
        }
    }

    fn error_agent(id: &'static str) -> StubAgent {
        StubAgent {
            id,
            signal: Signal::Error,
        }
    }

    #[tokio::test]
    async fn test_unregistered_agent_rejected_before_execution() {
        let uc = use_case(vec![info_agent("known")]);
        let input = RunPlanInput::new(
            AgentContext::new(),
            ExecutionPlan::sequential(["known", "unknown"]),
        );

        let err = uc.execute(input).await.unwrap_err();
        assert!(matches!(
            err,
            RunPlanError::InvalidPlan(DomainError::UnknownAgent(_))
        ));
        // The rejected run never started
        assert_eq!(uc.stats().runs_started, 0);
    }

    #[tokio::test]
    async fn test_sequential_fail_fast_scenario() {
        // plan = sequential[A, B], A emits error, fail-fast: exactly one
        // sub-report, overall error, B absent.
        let uc = use_case(vec![error_agent("a"), info_agent("b")]);
        let input = RunPlanInput::new(
            AgentContext::new(),
            ExecutionPlan::sequential(["a", "b"]).with_failure_policy(FailurePolicy::FailFast),
        );

        let report = uc.execute(input).await.unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.overall, Signal::Error);
        assert_eq!(report.sub_reports.len(), 1);
        assert!(report.has_sub_report(&AgentId::new("a")));
        assert!(!report.has_sub_report(&AgentId::new("b")));
    }

    #[tokio::test]
    async fn test_parallel_all_info_scenario() {
        // plan = parallel[A, B, C], all info: completion release, three
        // sub-reports, overall info.
        let uc = use_case(vec![info_agent("a"), info_agent("b"), info_agent("c")]);
        let input = RunPlanInput::new(
            AgentContext::new(),
            ExecutionPlan::parallel(["a", "b", "c"]),
        );

        let report = uc.execute(input).await.unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.overall, Signal::Info);
        assert_eq!(report.sub_reports.len(), 3);
        assert_eq!(report.strategy, "parallel");
    }

    #[tokio::test]
    async fn test_iterative_report_carries_round_history() {
        let uc = use_case(vec![info_agent("a")]);
        let input = RunPlanInput::new(
            AgentContext::new(),
            ExecutionPlan::iterative(
                Strategy::Sequential {
                    agents: vec!["a".into()],
                },
                4,
            ),
        );

        let report = uc.execute(input).await.unwrap();

        // An agent that writes nothing converges in the first round
        assert_eq!(report.converged, Some(true));
        assert_eq!(report.round_count(), 1);
        assert_eq!(report.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_is_rejected() {
        let token = CancellationToken::new();
        token.cancel();
        let uc = use_case(vec![info_agent("a")]).with_cancellation(token);
        let input = RunPlanInput::new(AgentContext::new(), ExecutionPlan::sequential(["a"]));

        let err = uc.execute(input).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_stats_accumulate_across_runs() {
        let uc = use_case(vec![info_agent("a"), info_agent("b")]);

        for _ in 0..2 {
            let input = RunPlanInput::new(
                AgentContext::new(),
                ExecutionPlan::parallel(["a", "b"]),
            );
            uc.execute(input).await.unwrap();
        }

        let stats = uc.stats();
        assert_eq!(stats.runs_started, 2);
        assert_eq!(stats.runs_completed, 2);
        assert_eq!(stats.runs_failed, 0);
        assert_eq!(stats.agents_invoked, 4);
        assert_eq!(stats.insights_collected, 4);
    }

    #[tokio::test]
    async fn test_failed_run_still_returns_structured_report() {
        let uc = use_case(vec![error_agent("a"), info_agent("b")]);
        let input = RunPlanInput::new(
            AgentContext::new(),
            ExecutionPlan::parallel(["a", "b"]).with_failure_policy(FailurePolicy::FailFast),
        );

        let report = uc.execute(input).await.unwrap();

        assert_eq!(report.status, RunStatus::Failed);
        assert!(!report.insights.is_empty());
        assert_eq!(uc.stats().runs_failed, 1);
    }
}
