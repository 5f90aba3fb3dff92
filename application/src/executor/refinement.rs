//! Refinement loop - iterative convergence over strategy rounds.
//!
//! Runs one round at a time through the [`StrategyExecutor`], then compares
//! the knowledge snapshot and aggregated signal against the previous round
//! using the plan's convergence rule. Stops when the rule holds or the
//! round cap is reached, whichever comes first. Hitting the cap is reported
//! as a `warn` insight, not a failure.

use super::StrategyExecutor;
use crate::knowledge::KnowledgeStore;
use crate::ports::progress::RunProgressNotifier;
use mesh_domain::{
    AgentContext, AgentInsight, AgentReport, ConvergenceRule, ExecutionPlan, RoundRecord,
    RunStatus, Strategy,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of an iterative run.
pub struct RefinementOutcome {
    /// History of every executed round, in order
    pub rounds: Vec<RoundRecord>,
    /// Reports of the final round (the basis of the returned aggregation),
    /// plus the cap-hit warning when applicable
    pub last_reports: Vec<AgentReport>,
    /// Whether the convergence rule held
    pub converged: bool,
    /// Terminal state of the whole iterative run
    pub status: RunStatus,
}

/// Drives rounds of an inner strategy until convergence or the round cap.
pub struct RefinementLoop<'a> {
    executor: &'a StrategyExecutor,
}

impl<'a> RefinementLoop<'a> {
    pub fn new(executor: &'a StrategyExecutor) -> Self {
        Self { executor }
    }

    pub async fn run(
        &self,
        inner: &Strategy,
        max_rounds: usize,
        rule: ConvergenceRule,
        plan: &ExecutionPlan,
        ctx: Arc<AgentContext>,
        store: &KnowledgeStore,
        cancel: &CancellationToken,
        progress: &dyn RunProgressNotifier,
    ) -> RefinementOutcome {
        let cap = max_rounds
            .min(self.executor.params().max_rounds_ceiling)
            .max(1);

        let mut rounds: Vec<RoundRecord> = Vec::new();
        let mut last_reports: Vec<AgentReport> = Vec::new();
        let mut prev_snapshot = store.snapshot().await;
        let mut converged = false;
        let mut status = RunStatus::Completed;

        for round in 1..=cap {
            if cancel.is_cancelled() {
                status = RunStatus::Failed;
                break;
            }

            debug!(round, cap, "starting refinement round");
            let outcome = self
                .executor
                .run_strategy(inner, plan, Arc::clone(&ctx), store, cancel, progress)
                .await;

            let snapshot = store.snapshot().await;
            let changed_keys = snapshot.changed_keys(&prev_snapshot);
            let signal = outcome.signal();

            last_reports = outcome.reports.clone();
            rounds.push(RoundRecord {
                round,
                reports: outcome.reports,
                signal,
                changed_keys: changed_keys.clone(),
            });

            if !outcome.status.is_completed() {
                progress.on_round_complete(round, false);
                status = RunStatus::Failed;
                break;
            }

            converged = rule.converged(signal, &changed_keys);
            progress.on_round_complete(round, converged);
            info!(
                round,
                converged,
                changed = changed_keys.len(),
                signal = %signal,
                "refinement round complete"
            );

            if converged {
                break;
            }
            prev_snapshot = snapshot;
        }

        if !converged && status.is_completed() {
            last_reports.push(
                AgentReport::new("coordinator").with_insight(AgentInsight::warn(
                    "iteration cap reached",
                    format!("no convergence after {} rounds", rounds.len()),
                )),
            );
        }

        RefinementOutcome {
            rounds,
            last_reports,
            converged,
            status,
        }
    }
}
