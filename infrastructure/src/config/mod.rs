//! Configuration file loading for agent-mesh
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Explicitly specified config file
//! 2. Project root: `./mesh.toml` or `./.mesh.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/agent-mesh/config.toml`
//! 4. Fallback: `~/.config/agent-mesh/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{FileArchiveConfig, FileConfig, FileEngineConfig};
pub use loader::{ConfigError, ConfigLoader};
