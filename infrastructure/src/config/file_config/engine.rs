//! Engine configuration from TOML (`[engine]` section)
//!
//! Controls the executor's timeouts and bounds. Values here become the
//! engine defaults; plan-level settings override them per run.
//!
//! Example configuration:
//!
//! ```toml
//! [engine]
//! agent_timeout_secs = 60
//! barrier_timeout_secs = 30
//! cancellation_grace_secs = 2
//! max_concurrency = 8
//! max_rounds_ceiling = 32
//! ```

use mesh_application::EngineParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Engine limits configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Per-agent timeout in seconds, applied when the plan sets none
    pub agent_timeout_secs: u64,
    /// Barrier timeout in seconds
    pub barrier_timeout_secs: u64,
    /// Grace period in seconds after a cancellation fires
    pub cancellation_grace_secs: u64,
    /// Bound on concurrently running agents (absent = unbounded)
    pub max_concurrency: Option<usize>,
    /// Hard ceiling on iterative rounds
    pub max_rounds_ceiling: usize,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 60,
            barrier_timeout_secs: 30,
            cancellation_grace_secs: 2,
            max_concurrency: None,
            max_rounds_ceiling: 32,
        }
    }
}

impl FileEngineConfig {
    /// Convert to the application-layer engine parameters.
    pub fn to_engine_params(&self) -> EngineParams {
        EngineParams::default()
            .with_default_agent_timeout(Duration::from_secs(self.agent_timeout_secs.max(1)))
            .with_barrier_timeout(Duration::from_secs(self.barrier_timeout_secs.max(1)))
            .with_cancellation_grace(Duration::from_secs(self.cancellation_grace_secs))
            .with_max_concurrency(self.max_concurrency)
            .with_max_rounds_ceiling(self.max_rounds_ceiling.max(1))
    }

    /// Collect human-readable warnings for suspicious values.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.agent_timeout_secs == 0 {
            warnings.push("engine.agent_timeout_secs is 0, clamping to 1".to_string());
        }
        if self.barrier_timeout_secs == 0 {
            warnings.push("engine.barrier_timeout_secs is 0, clamping to 1".to_string());
        }
        if self.max_concurrency == Some(0) {
            warnings.push("engine.max_concurrency is 0, treating as 1".to_string());
        }
        if self.max_rounds_ceiling == 0 {
            warnings.push("engine.max_rounds_ceiling is 0, clamping to 1".to_string());
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = FileEngineConfig::default();
        assert_eq!(config.agent_timeout_secs, 60);
        assert_eq!(config.barrier_timeout_secs, 30);
        assert!(config.max_concurrency.is_none());
    }

    #[test]
    fn test_engine_config_deserialize() {
        let toml_str = r#"
[engine]
agent_timeout_secs = 10
max_concurrency = 4
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.agent_timeout_secs, 10);
        assert_eq!(config.engine.max_concurrency, Some(4));
        // Unset fields fall back to defaults
        assert_eq!(config.engine.barrier_timeout_secs, 30);
    }

    #[test]
    fn test_to_engine_params() {
        let config = FileEngineConfig {
            agent_timeout_secs: 5,
            barrier_timeout_secs: 7,
            cancellation_grace_secs: 1,
            max_concurrency: Some(3),
            max_rounds_ceiling: 10,
        };
        let params = config.to_engine_params();
        assert_eq!(params.default_agent_timeout, Duration::from_secs(5));
        assert_eq!(params.barrier_timeout, Duration::from_secs(7));
        assert_eq!(params.max_concurrency, Some(3));
        assert_eq!(params.max_rounds_ceiling, 10);
    }

    #[test]
    fn test_validate_flags_zero_timeouts() {
        let config = FileEngineConfig {
            agent_timeout_secs: 0,
            ..Default::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("agent_timeout_secs"));
        // Clamping keeps the params usable anyway
        assert_eq!(
            config.to_engine_params().default_agent_timeout,
            Duration::from_secs(1)
        );
    }
}
