//! Event types for executor activity streaming
//!
//! These events describe one invocation as it runs:
//! - Run lifecycle (started, finished with statistics)
//! - Task lifecycle (admitted, completed, outcome discarded)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collection::{Shape, TaskKey};

/// Counters for one invocation, reported when it finishes
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total: usize,
    pub admitted: usize,
    pub completed: usize,
    pub discarded: usize,
    pub peak_in_flight: usize,
}

/// Core event enum - the vocabulary of executor activity
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutorEvent {
    /// An invocation has been dispatched
    RunStarted {
        run_id: String,
        shape: Shape,
        total: usize,
        limit: usize,
    },
    /// A task was invoked
    TaskAdmitted {
        run_id: String,
        key: TaskKey,
        in_flight: usize,
    },
    /// A task's first completion was accepted
    TaskCompleted { run_id: String, key: TaskKey, success: bool },
    /// A task completed after the run had already finished
    OutcomeDiscarded { run_id: String, key: TaskKey, success: bool },
    /// The final callback fired
    RunFinished {
        run_id: String,
        success: bool,
        failed_key: Option<TaskKey>,
        stats: RunStats,
    },
}

impl ExecutorEvent {
    /// Get the run ID for this event
    pub fn run_id(&self) -> &str {
        match self {
            ExecutorEvent::RunStarted { run_id, .. }
            | ExecutorEvent::TaskAdmitted { run_id, .. }
            | ExecutorEvent::TaskCompleted { run_id, .. }
            | ExecutorEvent::OutcomeDiscarded { run_id, .. }
            | ExecutorEvent::RunFinished { run_id, .. } => run_id,
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            ExecutorEvent::RunStarted { .. } => "RunStarted",
            ExecutorEvent::TaskAdmitted { .. } => "TaskAdmitted",
            ExecutorEvent::TaskCompleted { .. } => "TaskCompleted",
            ExecutorEvent::OutcomeDiscarded { .. } => "OutcomeDiscarded",
            ExecutorEvent::RunFinished { .. } => "RunFinished",
        }
    }
}

/// A timestamped event log entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: ExecutorEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: ExecutorEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}
