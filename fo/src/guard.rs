//! Completion guard
//!
//! Every admitted task receives a [`Completion`] wired to the scheduler that
//! admitted it. Only the first signal is forwarded; any later signal on the
//! same token is reported to the [`ErrorReporter`] and otherwise ignored.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, error};

use crate::collection::TaskKey;
use crate::error::CompletionError;

/// Receiver of out-of-band completion contract violations
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &CompletionError);
}

impl<F> ErrorReporter for F
where
    F: Fn(&CompletionError) + Send + Sync,
{
    fn report(&self, error: &CompletionError) {
        self(error)
    }
}

/// Default reporter: logs each violation
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, err: &CompletionError) {
        error!(key = %err.key(), "{}", err);
    }
}

/// Where a first completion is forwarded to
pub(crate) trait OutcomeSink<T, E>: Send + Sync {
    fn deliver(self: Arc<Self>, index: usize, outcome: Result<Vec<T>, E>);
}

struct Guard<T, E> {
    index: usize,
    key: TaskKey,
    consumed: AtomicBool,
    sink: Arc<dyn OutcomeSink<T, E>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl<T, E> Drop for Guard<T, E> {
    fn drop(&mut self) {
        if !self.consumed.load(Ordering::Acquire) {
            self.reporter.report(&CompletionError::Abandoned { key: self.key.clone() });
        }
    }
}

/// Completion signal handed to an admitted task
///
/// Cloning shares the same single-use token: across all clones only the first
/// call to [`complete`](Self::complete) (or a shorthand) takes effect.
pub struct Completion<T, E> {
    guard: Arc<Guard<T, E>>,
}

impl<T, E> Clone for Completion<T, E> {
    fn clone(&self) -> Self {
        Self {
            guard: Arc::clone(&self.guard),
        }
    }
}

impl<T, E> Completion<T, E> {
    pub(crate) fn new(
        index: usize,
        key: TaskKey,
        sink: Arc<dyn OutcomeSink<T, E>>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            guard: Arc::new(Guard {
                index,
                key,
                consumed: AtomicBool::new(false),
                sink,
                reporter,
            }),
        }
    }

    /// Key of the task this signal belongs to
    pub fn key(&self) -> &TaskKey {
        &self.guard.key
    }

    /// Whether the signal has already been used
    pub fn is_consumed(&self) -> bool {
        self.guard.consumed.load(Ordering::Acquire)
    }

    /// Signal the task's outcome
    pub fn complete(&self, outcome: Result<Vec<T>, E>) {
        let guard = &self.guard;
        if guard.consumed.swap(true, Ordering::AcqRel) {
            debug!(key = %guard.key, "Completion::complete: already consumed, reporting");
            guard.reporter.report(&CompletionError::DoubleCompletion { key: guard.key.clone() });
            return;
        }
        debug!(key = %guard.key, ok = outcome.is_ok(), "Completion::complete: forwarding");
        Arc::clone(&guard.sink).deliver(guard.index, outcome);
    }

    /// Signal success with a single value
    pub fn ok(&self, value: T) {
        self.complete(Ok(vec![value]));
    }

    /// Signal success with any number of values
    pub fn ok_values(&self, values: Vec<T>) {
        self.complete(Ok(values));
    }

    /// Signal failure
    pub fn fail(&self, err: E) {
        self.complete(Err(err));
    }
}

impl<T, E> std::fmt::Debug for Completion<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("key", &self.guard.key)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}
