//! Event Bus - pub/sub for executor activity
//!
//! The EventBus uses a tokio broadcast channel to deliver events to all
//! subscribers. Emitting never blocks the scheduler.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{ExecutorEvent, RunStats};
use crate::collection::{Shape, TaskKey};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Central event bus for executor activity
pub struct EventBus {
    tx: broadcast::Sender<ExecutorEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutorEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter bound to one run
    pub fn emitter_for(&self, run_id: impl Into<String>) -> EventEmitter {
        let run_id = run_id.into();
        debug!(%run_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            run_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for the scheduler to emit events for a single run
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<ExecutorEvent>,
    run_id: String,
}

impl EventEmitter {
    /// Get the run ID this emitter is bound to
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit a raw event
    pub fn emit(&self, event: ExecutorEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    pub fn run_started(&self, shape: Shape, total: usize, limit: usize) {
        self.emit(ExecutorEvent::RunStarted {
            run_id: self.run_id.clone(),
            shape,
            total,
            limit,
        });
    }

    pub fn task_admitted(&self, key: &TaskKey, in_flight: usize) {
        self.emit(ExecutorEvent::TaskAdmitted {
            run_id: self.run_id.clone(),
            key: key.clone(),
            in_flight,
        });
    }

    pub fn task_completed(&self, key: &TaskKey, success: bool) {
        self.emit(ExecutorEvent::TaskCompleted {
            run_id: self.run_id.clone(),
            key: key.clone(),
            success,
        });
    }

    pub fn outcome_discarded(&self, key: &TaskKey, success: bool) {
        self.emit(ExecutorEvent::OutcomeDiscarded {
            run_id: self.run_id.clone(),
            key: key.clone(),
            success,
        });
    }

    pub fn run_finished(&self, success: bool, failed_key: Option<TaskKey>, stats: RunStats) {
        self.emit(ExecutorEvent::RunFinished {
            run_id: self.run_id.clone(),
            success,
            failed_key,
            stats,
        });
    }
}

/// Create a shared event bus with default capacity
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}
