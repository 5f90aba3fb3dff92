//! Application-layer configuration

mod engine_params;

pub use engine_params::EngineParams;
