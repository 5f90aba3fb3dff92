//! Barrier synchronizer - rendezvous point for concurrently running agents.
//!
//! A barrier is created at the start of a synchronization phase with the full
//! participant set and destroyed when released. Release happens either when
//! every participant has arrived (`Complete`) or when the timeout elapses
//! (`TimedOut`, flagged as partial). A participant that fails before arriving
//! is registered through [`Barrier::arrive_with_failure`] by the executor so
//! the barrier cannot hang on a crashed agent.

use mesh_domain::AgentId;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

/// Terminal state of a barrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// Every participant arrived before the timeout; `failed` lists the
    /// subset that arrived via [`Barrier::arrive_with_failure`]
    Complete { failed: Vec<AgentId> },
    /// The timeout elapsed first; `missing` lists participants that never
    /// arrived
    TimedOut {
        missing: Vec<AgentId>,
        failed: Vec<AgentId>,
    },
}

impl BarrierOutcome {
    /// Check if the barrier released by completion
    pub fn is_complete(&self) -> bool {
        matches!(self, BarrierOutcome::Complete { .. })
    }
}

struct BarrierState {
    expected: BTreeSet<AgentId>,
    /// Arrival flag per participant: `true` means arrived-with-failure.
    /// First arrival wins; repeat arrivals are no-ops.
    arrived: BTreeMap<AgentId, bool>,
}

impl BarrierState {
    fn is_released(&self) -> bool {
        self.arrived.len() == self.expected.len()
    }

    fn failed(&self) -> Vec<AgentId> {
        self.arrived
            .iter()
            .filter(|(_, failed)| **failed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn missing(&self) -> Vec<AgentId> {
        self.expected
            .iter()
            .filter(|id| !self.arrived.contains_key(*id))
            .cloned()
            .collect()
    }
}

/// Named rendezvous point aligning a known set of agents.
pub struct Barrier {
    timeout: Duration,
    state: Mutex<BarrierState>,
    notify: Notify,
}

impl Barrier {
    /// Create a barrier expecting the given participants.
    pub fn new(participants: impl IntoIterator<Item = AgentId>, timeout: Duration) -> Self {
        Self {
            timeout,
            state: Mutex::new(BarrierState {
                expected: participants.into_iter().collect(),
                arrived: BTreeMap::new(),
            }),
            notify: Notify::new(),
        }
    }

    /// Register one successful arrival. Returns immediately. A second
    /// arrival by the same participant is an idempotent no-op; an id
    /// outside the participant set is ignored.
    pub fn arrive(&self, id: &AgentId) {
        self.register(id, false);
    }

    /// Register an arrival on behalf of a participant that failed before
    /// reaching the checkpoint (fault, timeout, non-responsive cancel).
    pub fn arrive_with_failure(&self, id: &AgentId) {
        self.register(id, true);
    }

    fn register(&self, id: &AgentId, failed: bool) {
        let mut state = self.state.lock().expect("barrier lock poisoned");
        if !state.expected.contains(id) {
            debug!("barrier arrival from unknown participant '{}'", id);
            return;
        }
        let released = {
            state.arrived.entry(id.clone()).or_insert(failed);
            state.is_released()
        };
        drop(state);
        if released {
            self.notify.notify_waiters();
        }
    }

    /// Suspend until all participants have arrived or the timeout elapses.
    pub async fn wait(&self) -> BarrierOutcome {
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            // Arm the waiter before checking state so a concurrent final
            // arrival between the check and the await is not lost.
            let notified = self.notify.notified();
            {
                let state = self.state.lock().expect("barrier lock poisoned");
                if state.is_released() {
                    return BarrierOutcome::Complete {
                        failed: state.failed(),
                    };
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                let state = self.state.lock().expect("barrier lock poisoned");
                return BarrierOutcome::TimedOut {
                    missing: state.missing(),
                    failed: state.failed(),
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ids(names: &[&str]) -> Vec<AgentId> {
        names.iter().map(|n| AgentId::new(*n)).collect()
    }

    #[tokio::test]
    async fn test_release_by_completion() {
        let barrier = Arc::new(Barrier::new(ids(&["a", "b"]), Duration::from_secs(5)));

        let waiter = {
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move { barrier.wait().await })
        };

        barrier.arrive(&AgentId::new("a"));
        barrier.arrive(&AgentId::new("b"));

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, BarrierOutcome::Complete { failed: vec![] });
    }

    #[tokio::test]
    async fn test_release_by_timeout_lists_missing() {
        let barrier = Barrier::new(ids(&["a", "b", "c"]), Duration::from_millis(30));
        barrier.arrive(&AgentId::new("a"));

        let outcome = barrier.wait().await;
        match outcome {
            BarrierOutcome::TimedOut { missing, failed } => {
                assert_eq!(missing, ids(&["b", "c"]));
                assert!(failed.is_empty());
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_arrive_with_failure_counts_toward_release() {
        let barrier = Barrier::new(ids(&["a", "b"]), Duration::from_secs(5));
        barrier.arrive(&AgentId::new("a"));
        barrier.arrive_with_failure(&AgentId::new("b"));

        let outcome = barrier.wait().await;
        assert_eq!(
            outcome,
            BarrierOutcome::Complete {
                failed: ids(&["b"])
            }
        );
    }

    #[tokio::test]
    async fn test_double_arrival_is_idempotent() {
        let barrier = Barrier::new(ids(&["a", "b"]), Duration::from_millis(30));
        barrier.arrive(&AgentId::new("a"));
        // Second arrival must not count as another participant, and must
        // not overwrite the original success flag.
        barrier.arrive(&AgentId::new("a"));
        barrier.arrive_with_failure(&AgentId::new("a"));

        let outcome = barrier.wait().await;
        match outcome {
            BarrierOutcome::TimedOut { missing, failed } => {
                assert_eq!(missing, ids(&["b"]));
                assert!(failed.is_empty());
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_after_all_arrived_returns_immediately() {
        let barrier = Barrier::new(ids(&["only"]), Duration::from_secs(5));
        barrier.arrive(&AgentId::new("only"));
        assert!(barrier.wait().await.is_complete());
    }

    #[tokio::test]
    async fn test_unknown_participant_ignored() {
        let barrier = Barrier::new(ids(&["a"]), Duration::from_secs(5));
        barrier.arrive(&AgentId::new("stranger"));
        barrier.arrive(&AgentId::new("a"));
        assert!(barrier.wait().await.is_complete());
    }
}
