//! Source view configuration persistence
//!
//! Stores preferences in `~/.config/reparse/config.yaml`

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinator::CoordinatorOptions;
use crate::syntax::tag_for_category;

/// Configuration shared by every source view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// File extensions (without the dot) that get a parse backend
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Token category -> tag name. Categories without an entry are not highlighted.
    #[serde(default = "crate::syntax::default_tags")]
    pub tags: BTreeMap<String, String>,

    /// Parse with `#include` lines blanked before the first real parse
    #[serde(default = "default_true")]
    pub redact_includes_on_first_parse: bool,

    /// Back-off before the worker retries a busy lock
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// How long the command line waits for the first publication
    #[serde(default = "default_parse_timeout_ms")]
    pub parse_timeout_ms: u64,
}

fn default_extensions() -> Vec<String> {
    ["c", "h", "cc", "cpp", "cxx", "hpp", "hh", "hxx"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_retry_interval_ms() -> u64 {
    10
}

fn default_parse_timeout_ms() -> u64 {
    5000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            tags: crate::syntax::default_tags(),
            redact_includes_on_first_parse: default_true(),
            retry_interval_ms: default_retry_interval_ms(),
            parse_timeout_ms: default_parse_timeout_ms(),
        }
    }
}

impl SourceConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };

        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_yaml(&content) {
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

    /// Parse a YAML document; missing fields take their defaults
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(&path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// True if files with this extension get a parse backend
    pub fn is_legal_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Tag for a token category, falling back to parent categories
    pub fn tag_for(&self, category: &str) -> Option<&str> {
        tag_for_category(&self.tags, category)
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            redact_first_parse: self.redact_includes_on_first_parse,
            retry_interval: Duration::from_millis(self.retry_interval_ms),
        }
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_millis(self.parse_timeout_ms)
    }
}
