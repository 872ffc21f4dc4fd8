//! Fanout configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::scheduler::ExecutorConfig;

/// Main Fanout configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Executor defaults
    pub executor: ExecutorConfig,

    /// Demo task timing used by `fo run`
    pub demo: DemoConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        self.executor.validate().context("Invalid executor configuration")?;
        self.demo.validate().context("Invalid demo configuration")?;
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise the first readable file among
    /// `./.fanout.yml` and `<config_dir>/fanout/fanout.yml` wins, then defaults.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let candidates = std::iter::once(PathBuf::from(".fanout.yml"))
            .chain(dirs::config_dir().map(|dir| dir.join("fanout").join("fanout.yml")));
        if let Some(config) = candidates.filter(|path| path.exists()).find_map(Self::try_load) {
            return Ok(config);
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load a fallback candidate, logging and skipping it when unusable
    fn try_load(path: PathBuf) -> Option<Self> {
        Self::load_from_file(&path)
            .inspect_err(|e| tracing::warn!("Failed to load config from {}: {}", path.display(), e))
            .ok()
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Timing of the simulated tasks built by `fo run`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Milliseconds of delay per unit of task value
    #[serde(rename = "unit-ms")]
    pub unit_ms: u64,

    /// Delay before a spliced failing task fails, in milliseconds
    #[serde(rename = "fail-after-ms")]
    pub fail_after_ms: u64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            unit_ms: 10,
            fail_after_ms: 25,
        }
    }
}

impl DemoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.unit_ms == 0 {
            return Err(eyre::eyre!("unit-ms must be positive"));
        }
        Ok(())
    }
}
