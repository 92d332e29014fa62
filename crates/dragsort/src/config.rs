use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime configuration for the ordering layer
///
/// Sort value bounds are not configured here: they are constants of the
/// pivot type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingConfig {
    /// Hold a per-relation mutex around every mutating call.
    pub serialize_per_relation: bool,
    /// Make the in-memory store's batched writes all-or-nothing.
    pub atomic_batches: bool,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            serialize_per_relation: false,
            atomic_batches: true,
            log_filter: "info".to_string(),
        }
    }
}

impl OrderingConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config YAML {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: OrderingConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }
}
