//! Agent registry - the closed set of invokable agent units.
//!
//! Agents are registered under their string identifier before any plan may
//! reference them. A plan naming an unregistered id is a configuration
//! error, rejected before execution starts.

use crate::ports::agent::Agent;
use mesh_domain::AgentId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Registry of agent implementations looked up by identifier.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    agents: HashMap<AgentId, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent under its own id. Re-registering the same id
    /// replaces the previous implementation.
    pub fn register(&mut self, agent: Arc<dyn Agent>) -> AgentId {
        let id = agent.id();
        debug!("registering agent '{}'", id);
        self.agents.insert(id.clone(), agent);
        id
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    /// Look up an agent by id.
    pub fn resolve(&self, id: &AgentId) -> Option<Arc<dyn Agent>> {
        self.agents.get(id).cloned()
    }

    /// The set of registered ids, used for plan validation.
    pub fn registered_ids(&self) -> HashSet<AgentId> {
        self.agents.keys().cloned().collect()
    }

    /// Number of registered agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if no agents are registered
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
