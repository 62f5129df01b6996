//! Configuration for w2m

mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

use crate::import::{FilterKind, FilterRule, ImportConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "w2m.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Import run configuration
    #[serde(default)]
    pub import: ImportConfig,
    /// Custom field filter rules, applied in order
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.import.max_items_per_pass == Some(0) {
            errors.push("max_items_per_pass must be positive".to_string());
        }
        if let (Some(mapping), Some(report)) = (&self.import.mapping_path, &self.import.report_path)
        {
            if mapping == report {
                errors.push(format!(
                    "mapping_path and report_path must differ (both '{}')",
                    mapping.display()
                ));
            }
        }

        for (i, rule) in self.filters.iter().enumerate() {
            if rule.key.trim().is_empty() {
                errors.push(format!("filters[{}]: key must not be empty", i));
            }
            if let FilterKind::Replace { from, .. } = &rule.filter {
                if from.is_empty() {
                    errors.push(format!(
                        "filters[{}]: replace filter for '{}' needs a non-empty 'from'",
                        i, rule.key
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}
