//! Conditional strategy execution.
//!
//! Stages are evaluated in plan order. Each stage's predicate is tested
//! against the aggregated signal of the stages executed so far; unmet
//! stages are skipped and contribute no insights. The chosen path is
//! recorded for auditability. "No applicable stage" is a valid outcome,
//! not an error.

use super::{RoundOutcome, StrategyExecutor};
use crate::knowledge::KnowledgeStore;
use crate::ports::progress::RunProgressNotifier;
use mesh_domain::{AgentContext, ConditionalStage, ExecutionPlan, RunStatus, Signal};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

impl StrategyExecutor {
    pub(crate) async fn run_conditional(
        &self,
        stages: &[ConditionalStage],
        plan: &ExecutionPlan,
        ctx: Arc<AgentContext>,
        store: &KnowledgeStore,
        cancel: &CancellationToken,
        progress: &dyn RunProgressNotifier,
    ) -> RoundOutcome {
        let mut reports = Vec::new();
        let mut chosen_path = Vec::new();
        let mut upstream = Signal::Info;
        let mut status = RunStatus::Completed;

        for stage in stages {
            if cancel.is_cancelled() {
                status = RunStatus::Failed;
                break;
            }

            if !stage.condition.matches(upstream) {
                debug!(
                    "skipping stage '{}' (condition unmet at signal '{}')",
                    stage.name, upstream
                );
                continue;
            }

            progress.on_stage_chosen(&stage.name);
            chosen_path.push(stage.name.clone());

            let group = self
                .run_group(
                    &stage.agents,
                    None,
                    plan,
                    Arc::clone(&ctx),
                    store,
                    cancel,
                    progress,
                )
                .await;

            // Stage errors feed the next predicates rather than aborting
            // the stage loop; only a barrier timeout fails the run here.
            upstream = group
                .reports
                .iter()
                .map(|r| r.signal())
                .fold(upstream, Signal::escalate);
            let complete = group.complete;
            reports.extend(group.reports);

            if !complete {
                status = RunStatus::Failed;
                break;
            }
        }

        RoundOutcome {
            reports,
            status,
            chosen_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{ScriptedAgent, executor_with, run};
    use mesh_domain::{
        AgentId, ConditionalStage, ExecutionPlan, RunStatus, Signal, StageCondition,
    };

    fn stage(name: &str, agents: &[&str]) -> ConditionalStage {
        ConditionalStage::new(name, agents.iter().map(|a| AgentId::new(*a)).collect())
    }

    #[tokio::test]
    async fn test_error_signal_routes_to_remediation_stage() {
        let executor = executor_with(vec![
            ScriptedAgent::erroring("detector"),
            ScriptedAgent::ok("remediator"),
            ScriptedAgent::ok("fast-path"),
        ]);
        let plan = ExecutionPlan::conditional(vec![
            stage("triage", &["detector"]),
            stage("remediate", &["remediator"]).when(StageCondition::SignalAtLeast(Signal::Error)),
            stage("fast-path", &["fast-path"]).when(StageCondition::SignalBelow(Signal::Warn)),
        ]);

        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert_eq!(outcome.chosen_path, vec!["triage", "remediate"]);
        assert_eq!(outcome.reports.len(), 2);
        // The skipped stage contributed nothing
        assert!(
            !outcome
                .reports
                .iter()
                .any(|r| r.agent == AgentId::new("fast-path"))
        );
    }

    #[tokio::test]
    async fn test_clean_signal_takes_fast_path() {
        let executor = executor_with(vec![
            ScriptedAgent::ok("detector"),
            ScriptedAgent::ok("remediator"),
            ScriptedAgent::ok("fast-path"),
        ]);
        let plan = ExecutionPlan::conditional(vec![
            stage("triage", &["detector"]),
            stage("remediate", &["remediator"]).when(StageCondition::SignalAtLeast(Signal::Error)),
            stage("fast-path", &["fast-path"]).when(StageCondition::SignalBelow(Signal::Warn)),
        ]);

        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.chosen_path, vec!["triage", "fast-path"]);
    }

    #[tokio::test]
    async fn test_no_matching_stage_completes_empty() {
        let executor = executor_with(vec![ScriptedAgent::ok("escalation")]);
        let plan = ExecutionPlan::conditional(vec![
            stage("escalation", &["escalation"]).when(StageCondition::SignalAtLeast(Signal::Warn)),
        ]);

        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.status, RunStatus::Completed);
        assert!(outcome.chosen_path.is_empty());
        assert!(outcome.reports.is_empty());
    }

    #[tokio::test]
    async fn test_stage_agents_run_concurrently() {
        use std::time::{Duration, Instant};

        let executor = executor_with(vec![
            ScriptedAgent::slow("s1", Duration::from_millis(60)),
            ScriptedAgent::slow("s2", Duration::from_millis(60)),
            ScriptedAgent::slow("s3", Duration::from_millis(60)),
        ]);
        let plan = ExecutionPlan::conditional(vec![stage("batch", &["s1", "s2", "s3"])]);

        let started = Instant::now();
        let outcome = run(&executor, &plan).await;

        assert_eq!(outcome.reports.len(), 3);
        // Wall time is bounded by the slowest agent, not the sum
        assert!(started.elapsed() < Duration::from_millis(150));
    }
}
