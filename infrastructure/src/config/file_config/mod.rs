//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into application-layer
//! parameters where appropriate.

mod archive;
mod engine;

pub use archive::FileArchiveConfig;
pub use engine::FileEngineConfig;

use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Executor limits and timeouts
    pub engine: FileEngineConfig,
    /// Run archive settings
    pub archive: FileArchiveConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected warnings.
    pub fn validate(&self) -> Vec<String> {
        self.engine.validate()
    }
}
