//! Fanout - bounded concurrent task fan-out
//!
//! Fanout runs a keyed collection of independent asynchronous tasks, either
//! all at once or with a bounded number in flight, and collects their results
//! in a container shaped like the input.
//!
//! # Core Concepts
//!
//! - **Shape preserving**: a sequence of tasks yields a sequence of results, a
//!   string-keyed mapping yields a mapping, no input yields no container
//! - **Ordered admission**: tasks start strictly in input order; completion
//!   order is whatever the tasks' own latencies produce
//! - **First error wins**: the first failure finishes the run immediately;
//!   tasks already running continue but their outcomes are discarded
//! - **Guarded completion**: a task signalling completion twice is reported to
//!   an [`ErrorReporter`] and has no other effect
//!
//! # Modules
//!
//! - [`collection`] - Keyed collection adapter
//! - [`task`] - Task construction
//! - [`guard`] - Completion signal and error reporting
//! - [`results`] - Result aggregation
//! - [`scheduler`] - Executor and admission logic
//! - [`events`] - Run activity event bus
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`demo`] - Delay-based demo tasks used by the CLI

pub mod cli;
pub mod collection;
pub mod config;
pub mod demo;
pub mod error;
pub mod events;
pub mod guard;
pub mod results;
pub mod scheduler;
pub mod task;

// Re-export commonly used types
pub use collection::{Shape, TaskCollection, TaskKey};
pub use config::Config;
pub use error::{CompletionError, ExecutorError, RunError};
pub use events::{EventBus, EventEmitter, EventLogEntry, ExecutorEvent, RunStats, create_event_bus};
pub use guard::{Completion, ErrorReporter, TracingReporter};
pub use results::{Results, TaskValue};
pub use scheduler::{Executor, ExecutorConfig, FinishFn, RunHandle};
pub use task::Task;
