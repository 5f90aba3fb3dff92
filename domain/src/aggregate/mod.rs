//! Insight aggregation - merging per-agent reports into one ranked report.
//!
//! Ordering is a pure function of (severity rank, plan position, emission
//! order), so re-running a plan with agents completing in a different
//! real-time order yields an identical insight sequence.

use crate::agent::insight::AgentInsight;
use crate::agent::report::AgentReport;
use crate::agent::value_objects::{AgentId, PlanId};
use crate::core::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Terminal state of a coordinator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// All dispatched work finished (insights may still carry errors
    /// under the collect-all policy)
    Completed,
    /// The run was cut short: fail-fast tripped, a barrier timed out,
    /// or the run was cancelled
    Failed,
}

impl RunStatus {
    /// Check if the run completed
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// An insight annotated with the agent that emitted it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedInsight {
    /// Emitting agent
    pub agent: AgentId,
    /// The finding itself
    pub insight: AgentInsight,
}

/// History record of one iterative round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRecord {
    /// Round number (1-indexed)
    pub round: usize,
    /// Reports collected in this round
    pub reports: Vec<AgentReport>,
    /// Aggregated signal of this round
    pub signal: Signal,
    /// Knowledge keys that changed relative to the prior round
    pub changed_keys: Vec<String>,
}

/// The merged, ranked result of one coordinator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedReport {
    /// The plan that produced this report
    pub plan_id: PlanId,
    /// Strategy label ("sequential", "parallel", ...)
    pub strategy: String,
    /// Terminal run state
    pub status: RunStatus,
    /// Run-level signal: highest severity present across all insights
    pub overall: Signal,
    /// All insights, ranked per the deterministic ordering
    pub insights: Vec<RankedInsight>,
    /// Per-agent sub-reports, in plan order
    pub sub_reports: Vec<AgentReport>,
    /// Stages that actually ran (conditional plans), in execution order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chosen_path: Vec<String>,
    /// Round history (iterative plans)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rounds: Vec<RoundRecord>,
    /// Whether the convergence predicate held (iterative plans only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converged: Option<bool>,
}

impl AggregatedReport {
    /// Merge `reports` into a ranked report.
    ///
    /// `plan_order` is the deduplicated plan-position list from
    /// [`Strategy::plan_positions`](crate::plan::Strategy::plan_positions);
    /// it drives both sub-report order and the ordering tie-break.
    /// The aggregator consumes the reports and has no other side effects.
    pub fn aggregate(
        plan_id: PlanId,
        strategy: impl Into<String>,
        status: RunStatus,
        plan_order: &[AgentId],
        reports: Vec<AgentReport>,
    ) -> Self {
        let position: HashMap<&AgentId, usize> = plan_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id, i))
            .collect();
        let pos_of = |id: &AgentId| position.get(id).copied().unwrap_or(usize::MAX);

        let mut sub_reports = reports;
        sub_reports.sort_by_key(|r| pos_of(&r.agent));

        let mut ranked: Vec<(u8, usize, usize, RankedInsight)> = Vec::new();
        for report in &sub_reports {
            let plan_pos = pos_of(&report.agent);
            for (emission, insight) in report.insights.iter().enumerate() {
                ranked.push((
                    insight.signal.rank(),
                    plan_pos,
                    emission,
                    RankedInsight {
                        agent: report.agent.clone(),
                        insight: insight.clone(),
                    },
                ));
            }
        }
        // Severity descending, then plan position and emission order ascending
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));

        let insights: Vec<RankedInsight> = ranked.into_iter().map(|(_, _, _, i)| i).collect();
        let overall = insights
            .iter()
            .map(|r| r.insight.signal)
            .fold(Signal::Info, Signal::escalate);

        Self {
            plan_id,
            strategy: strategy.into(),
            status,
            overall,
            insights,
            sub_reports,
            chosen_path: Vec::new(),
            rounds: Vec::new(),
            converged: None,
        }
    }

    /// Records the conditional audit trail.
    pub fn with_chosen_path(mut self, path: Vec<String>) -> Self {
        self.chosen_path = path;
        self
    }

    /// Records the iterative round history and convergence outcome.
    pub fn with_rounds(mut self, rounds: Vec<RoundRecord>, converged: bool) -> Self {
        self.rounds = rounds;
        self.converged = Some(converged);
        self
    }

    /// Number of rounds executed (0 for non-iterative runs).
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Check if a given agent contributed a sub-report
    pub fn has_sub_report(&self, agent: &AgentId) -> bool {
        self.sub_reports.iter().any(|r| &r.agent == agent)
    }
}
