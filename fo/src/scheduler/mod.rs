//! Scheduler for task fan-out
//!
//! Admits tasks in input order under a concurrency limit, routes each task's
//! first completion, short-circuits on the first error and fires the final
//! callback exactly once per invocation.

mod config;
mod core;
mod finish;

pub use config::ExecutorConfig;
pub use core::Executor;
pub use finish::{FinishFn, RunHandle};
