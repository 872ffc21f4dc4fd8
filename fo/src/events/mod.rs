//! Event stream for live observability of runs
//!
//! The scheduler emits an event for every admission, accepted completion,
//! discarded outcome and run boundary. Consumers (the CLI's `--events` log,
//! tests, metrics) subscribe to the bus. Event order reflects real completion
//! order and is not deterministic; results are.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fanout::events::create_event_bus;
//! use fanout::{Executor, ExecutorConfig};
//!
//! let bus = create_event_bus();
//! let executor = Executor::new(ExecutorConfig::default()).with_event_bus(bus.clone());
//!
//! let mut rx = bus.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{}: {}", event.run_id(), event.event_type());
//! }
//! ```

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, create_event_bus};
pub use types::{EventLogEntry, ExecutorEvent, RunStats};
