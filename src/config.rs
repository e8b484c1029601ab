//! User configuration
//!
//! Read from `~/.config/gsheet-tui/config.yaml`, which the user writes by
//! hand. A missing or unreadable file falls back to defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sheet_sync::EditableRange;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Columns that may be edited, e.g. "B:E"
    #[serde(default = "default_editable_range")]
    pub editable_range: String,

    /// Environment variable holding an OAuth access token
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// File holding an OAuth access token, used when the env var is unset
    #[serde(default)]
    pub token_file: Option<PathBuf>,

    /// Keep edits that failed to flush for the next session
    #[serde(default = "default_journal")]
    pub journal: bool,
}

fn default_editable_range() -> String {
    "B:E".to_string()
}

fn default_token_env() -> String {
    "GSHEET_ACCESS_TOKEN".to_string()
}

fn default_journal() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            editable_range: default_editable_range(),
            token_env: default_token_env(),
            token_file: None,
            journal: default_journal(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn editable_range(&self) -> Result<EditableRange> {
        self.editable_range
            .parse()
            .with_context(|| format!("Bad editable_range '{}' in config", self.editable_range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("nope.yaml"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.editable_range().unwrap(), EditableRange::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "editable_range: C:F\njournal: false\n").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.editable_range().unwrap(), EditableRange::new(2, 5).unwrap());
        assert!(!config.journal);
        assert_eq!(config.token_env, "GSHEET_ACCESS_TOKEN");
    }

    #[test]
    fn test_garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "editable_range: [oops").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_bad_range_is_an_error() {
        let config = AppConfig { editable_range: "E:B".into(), ..AppConfig::default() };
        assert!(config.editable_range().is_err());
    }
}
