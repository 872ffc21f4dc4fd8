//! Executor configuration

use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::DEFAULT_CHANNEL_CAPACITY;

/// Executor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Concurrency limit used by `run_bounded`
    #[serde(default = "default_limit", rename = "default-limit")]
    pub default_limit: usize,

    /// Capacity of the event bus created for this executor
    #[serde(default = "default_event_capacity", rename = "event-capacity")]
    pub event_capacity: usize,
}

fn default_limit() -> usize {
    debug!("default_limit: called");
    10
}

fn default_event_capacity() -> usize {
    debug!("default_event_capacity: called");
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        debug!("ExecutorConfig::default: called");
        Self {
            default_limit: 10,
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ExecutorConfig {
    /// Reject values the executor cannot run with
    pub fn validate(&self) -> Result<()> {
        debug!(?self, "ExecutorConfig::validate: called");
        if self.default_limit == 0 {
            return Err(eyre!("default-limit must be positive"));
        }
        if self.event_capacity == 0 {
            return Err(eyre!("event-capacity must be positive"));
        }
        Ok(())
    }
}
