//! Run archive configuration from TOML (`[archive]` section)
//!
//! Example configuration:
//!
//! ```toml
//! [archive]
//! enabled = true
//! path = "~/.local/share/agent-mesh/runs.jsonl"
//! ```

use serde::{Deserialize, Serialize};

/// Run archive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileArchiveConfig {
    /// Whether run events are archived at all
    pub enabled: bool,
    /// Target file for the JSONL archive
    pub path: Option<String>,
}

impl Default for FileArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_config_default() {
        let config = FileArchiveConfig::default();
        assert!(!config.enabled);
        assert!(config.path.is_none());
    }

    #[test]
    fn test_archive_config_deserialize() {
        let toml_str = r#"
[archive]
enabled = true
path = "runs.jsonl"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.archive.enabled);
        assert_eq!(config.archive.path.as_deref(), Some("runs.jsonl"));
    }
}
