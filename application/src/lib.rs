//! Application layer for agent-mesh
//!
//! This crate contains the use cases, port definitions, and the concurrent
//! machinery of the orchestration engine: the knowledge store, the barrier
//! synchronizer, the strategy executor, and the refinement loop. It depends
//! only on the domain layer.

pub mod config;
pub mod executor;
pub mod knowledge;
pub mod ports;
pub mod registry;
pub mod sync;
pub mod use_cases;

// Re-export commonly used types
pub use config::EngineParams;
pub use executor::refinement::{RefinementLoop, RefinementOutcome};
pub use executor::{RoundOutcome, StrategyExecutor};
pub use knowledge::{KnowledgeHandle, KnowledgeStore};
pub use ports::{
    agent::{Agent, AgentFault},
    progress::{NoProgress, RunProgressNotifier},
    run_archive::{ArchiveEvent, NoArchive, RunArchive},
};
pub use registry::AgentRegistry;
pub use sync::barrier::{Barrier, BarrierOutcome};
pub use use_cases::run_plan::{RunPlanError, RunPlanInput, RunPlanUseCase, RunStats};
