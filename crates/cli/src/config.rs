//! Run configuration files (YAML or TOML)

use anyhow::{Context, Result};
use codesieve_core::FilterConfig;
use codesieve_formats::shard::{ShardFormat, DEFAULT_MAX_SHARD_BYTES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings that can live in a config file. Every field is optional and
/// command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub filters: FilterConfig,
    pub output: OutputConfig,
}

/// How shards are written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: ShardFormat,
    /// Upper bound on content bytes per shard
    pub max_shard_bytes: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ShardFormat::default(),
            max_shard_bytes: DEFAULT_MAX_SHARD_BYTES,
        }
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|s| s.to_str()).unwrap_or("")
}

impl RunConfig {
    /// Load configuration from a `.yaml`, `.yml` or `.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        match extension(path) {
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            other => Err(anyhow::anyhow!(
                "Unsupported config file format: {}. Use .yaml, .yml, or .toml",
                other
            )),
        }
    }

    /// Write configuration to a `.yaml`, `.yml` or `.toml` file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match extension(path) {
            "yaml" | "yml" => serde_yaml::to_string(self)?,
            "toml" => toml::to_string_pretty(self)?,
            other => {
                return Err(anyhow::anyhow!(
                    "Unsupported config file format: {}. Use .yaml, .yml, or .toml",
                    other
                ))
            }
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}
