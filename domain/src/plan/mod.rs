//! Execution plan: the declarative description of one coordination run.
//!
//! A plan names the participating agents, the strategy that drives them
//! (sequential, parallel, conditional, iterative), the failure policy, and
//! optional per-agent timeouts. Plans are created by the caller and are
//! read-only for the duration of the run.

use crate::agent::value_objects::{AgentId, PlanId};
use crate::core::error::DomainError;
use crate::core::signal::Signal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// What happens to the rest of a run once an agent fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop dispatching further agents after the first `error` insight;
    /// insights already collected are still returned
    FailFast,
    /// Run every planned agent regardless of prior failures
    #[default]
    CollectAll,
}

impl FailurePolicy {
    /// Check if this is the fail-fast policy
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, FailurePolicy::FailFast)
    }
}

/// Predicate deciding whether a conditional stage runs.
///
/// Evaluated against the aggregated signal of all stages executed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageCondition {
    /// Stage always runs
    #[default]
    Always,
    /// Stage runs only when the upstream signal is at least this severe
    SignalAtLeast(Signal),
    /// Stage runs only when the upstream signal is less severe than this
    SignalBelow(Signal),
}

impl StageCondition {
    /// Evaluate the condition against the upstream aggregated signal.
    pub fn matches(&self, upstream: Signal) -> bool {
        match self {
            StageCondition::Always => true,
            StageCondition::SignalAtLeast(min) => upstream >= *min,
            StageCondition::SignalBelow(max) => upstream < *max,
        }
    }
}

/// One stage of a conditional plan: a named agent group behind a predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalStage {
    /// Stage name, recorded in the chosen-path audit trail
    pub name: String,
    /// Predicate gating this stage
    pub condition: StageCondition,
    /// Agents that run (concurrently) when the stage is chosen
    pub agents: Vec<AgentId>,
}

impl ConditionalStage {
    pub fn new(name: impl Into<String>, agents: Vec<AgentId>) -> Self {
        Self {
            name: name.into(),
            condition: StageCondition::Always,
            agents,
        }
    }

    /// Sets the stage predicate.
    pub fn when(mut self, condition: StageCondition) -> Self {
        self.condition = condition;
        self
    }
}

/// Convergence predicate for iterative runs, evaluated after each round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConvergenceRule {
    /// No `error` insights AND no knowledge key changed since the prior round
    #[default]
    Stable,
    /// No `error` insights in the round's reports
    CleanReport,
    /// No knowledge key changed since the prior round
    SettledStore,
}

impl ConvergenceRule {
    /// Evaluate the rule for one completed round.
    ///
    /// `round_signal` is the aggregated signal of the round's reports;
    /// `changed_keys` is the knowledge diff against the prior round.
    pub fn converged(&self, round_signal: Signal, changed_keys: &[String]) -> bool {
        match self {
            ConvergenceRule::Stable => !round_signal.is_error() && changed_keys.is_empty(),
            ConvergenceRule::CleanReport => !round_signal.is_error(),
            ConvergenceRule::SettledStore => changed_keys.is_empty(),
        }
    }
}

/// Execution strategy driving the agents of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "mode")]
pub enum Strategy {
    /// Agents run one at a time in plan order
    Sequential { agents: Vec<AgentId> },
    /// All agents launch concurrently, aligned by a single barrier
    Parallel {
        agents: Vec<AgentId>,
        /// Optional bound on concurrently running agents
        #[serde(skip_serializing_if = "Option::is_none")]
        max_concurrency: Option<usize>,
    },
    /// Stages gated by signal predicates, evaluated in order
    Conditional { stages: Vec<ConditionalStage> },
    /// Rounds of an inner strategy until convergence or the round cap
    Iterative {
        inner: Box<Strategy>,
        max_rounds: usize,
        #[serde(default)]
        convergence: ConvergenceRule,
    },
}

impl Strategy {
    /// Short strategy label used in reports and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Sequential { .. } => "sequential",
            Strategy::Parallel { .. } => "parallel",
            Strategy::Conditional { .. } => "conditional",
            Strategy::Iterative { .. } => "iterative",
        }
    }

    /// All agent ids referenced anywhere in the strategy, in plan order,
    /// duplicates included.
    pub fn referenced_agents(&self) -> Vec<&AgentId> {
        match self {
            Strategy::Sequential { agents } | Strategy::Parallel { agents, .. } => {
                agents.iter().collect()
            }
            Strategy::Conditional { stages } => {
                stages.iter().flat_map(|s| s.agents.iter()).collect()
            }
            Strategy::Iterative { inner, .. } => inner.referenced_agents(),
        }
    }

    /// Plan-order position of each distinct agent, used by the aggregator
    /// for deterministic ordering. First occurrence wins.
    pub fn plan_positions(&self) -> Vec<AgentId> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for id in self.referenced_agents() {
            if seen.insert(id.clone()) {
                ordered.push(id.clone());
            }
        }
        ordered
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Declarative description of one coordination run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Plan identifier, echoed into the aggregated report
    pub id: PlanId,
    /// The strategy that drives the agents
    pub strategy: Strategy,
    /// Per-agent timeout enforced by the executor around each invocation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_timeout: Option<Duration>,
    /// Failure policy for the whole run
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl ExecutionPlan {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            id: PlanId::generate(),
            strategy,
            agent_timeout: None,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Convenience constructor for a sequential plan.
    pub fn sequential(agents: impl IntoIterator<Item = impl Into<AgentId>>) -> Self {
        Self::new(Strategy::Sequential {
            agents: agents.into_iter().map(Into::into).collect(),
        })
    }

    /// Convenience constructor for a parallel plan.
    pub fn parallel(agents: impl IntoIterator<Item = impl Into<AgentId>>) -> Self {
        Self::new(Strategy::Parallel {
            agents: agents.into_iter().map(Into::into).collect(),
            max_concurrency: None,
        })
    }

    /// Convenience constructor for a conditional plan.
    pub fn conditional(stages: Vec<ConditionalStage>) -> Self {
        Self::new(Strategy::Conditional { stages })
    }

    /// Convenience constructor for an iterative plan over an inner strategy.
    pub fn iterative(inner: Strategy, max_rounds: usize) -> Self {
        Self::new(Strategy::Iterative {
            inner: Box::new(inner),
            max_rounds,
            convergence: ConvergenceRule::default(),
        })
    }

    pub fn with_id(mut self, id: impl Into<PlanId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_agent_timeout(mut self, timeout: Duration) -> Self {
        self.agent_timeout = Some(timeout);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Sets the convergence rule of an iterative plan; no-op otherwise.
    pub fn with_convergence(mut self, rule: ConvergenceRule) -> Self {
        if let Strategy::Iterative { convergence, .. } = &mut self.strategy {
            *convergence = rule;
        }
        self
    }

    /// Validate the plan against the set of registered agent ids.
    ///
    /// Rejected before any agent executes: empty plans, a parallel group
    /// naming the same agent twice (it can only arrive at the barrier once),
    /// unregistered ids, a conditional plan with no stages, an iterative
    /// plan with zero rounds or a nested iterative inner strategy.
    pub fn validate(&self, registered: &HashSet<AgentId>) -> Result<(), DomainError> {
        Self::validate_strategy(&self.strategy, registered)
    }

    fn validate_strategy(
        strategy: &Strategy,
        registered: &HashSet<AgentId>,
    ) -> Result<(), DomainError> {
        let referenced = strategy.referenced_agents();
        if referenced.is_empty() {
            return Err(DomainError::EmptyPlan);
        }
        for id in referenced {
            if !registered.contains(id) {
                return Err(DomainError::UnknownAgent(id.to_string()));
            }
        }

        match strategy {
            Strategy::Sequential { .. } => Ok(()),
            Strategy::Parallel { agents, .. } => {
                let mut seen = HashSet::new();
                for id in agents {
                    if !seen.insert(id) {
                        return Err(DomainError::DuplicateAgent(id.to_string()));
                    }
                }
                Ok(())
            }
            Strategy::Conditional { stages } => {
                if stages.is_empty() {
                    return Err(DomainError::InvalidPlan(
                        "conditional plan has no stages".to_string(),
                    ));
                }
                for stage in stages {
                    if stage.agents.is_empty() {
                        return Err(DomainError::InvalidPlan(format!(
                            "conditional stage '{}' has no agents",
                            stage.name
                        )));
                    }
                    let mut seen = HashSet::new();
                    for id in &stage.agents {
                        if !seen.insert(id) {
                            return Err(DomainError::DuplicateAgent(id.to_string()));
                        }
                    }
                }
                Ok(())
            }
            Strategy::Iterative {
                inner, max_rounds, ..
            } => {
                if *max_rounds == 0 {
                    return Err(DomainError::InvalidPlan(
                        "iterative plan requires max_rounds >= 1".to_string(),
                    ));
                }
                if matches!(inner.as_ref(), Strategy::Iterative { .. }) {
                    return Err(DomainError::InvalidPlan(
                        "iterative plan cannot nest another iterative strategy".to_string(),
                    ));
                }
                Self::validate_strategy(inner, registered)
            }
        }
    }
}
