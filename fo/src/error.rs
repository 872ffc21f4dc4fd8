//! Executor error types

use thiserror::Error;

use crate::collection::TaskKey;

/// Errors raised eagerly when an invocation is dispatched
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Concurrency limit must be positive, got {limit}")]
    InvalidLimit { limit: usize },

    #[error("No tokio runtime available to spawn tasks on")]
    NoRuntime,
}

/// Contract violations by a task's use of its completion signal
///
/// These are never delivered to the final callback; they go to the
/// [`ErrorReporter`](crate::guard::ErrorReporter) configured on the executor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("completion signaled more than once for task {key}")]
    DoubleCompletion { key: TaskKey },

    #[error("task {key} dropped its completion signal without firing it")]
    Abandoned { key: TaskKey },
}

impl CompletionError {
    /// Key of the offending task
    pub fn key(&self) -> &TaskKey {
        match self {
            CompletionError::DoubleCompletion { key } => key,
            CompletionError::Abandoned { key } => key,
        }
    }
}

/// Failure outcome of a future-style run
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError<E> {
    /// The first task error observed by the invocation
    #[error("task failed: {0}")]
    Task(E),

    /// Every admitted task released its completion signal and the run could never finish
    #[error("run abandoned: a task never signaled completion")]
    Abandoned,
}

impl<E> RunError<E> {
    /// The task error, if this is one
    pub fn into_task_error(self) -> Option<E> {
        match self {
            RunError::Task(err) => Some(err),
            RunError::Abandoned => None,
        }
    }

    /// Check if the run was abandoned rather than failed by a task
    pub fn is_abandoned(&self) -> bool {
        matches!(self, RunError::Abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_limit_message() {
        let err = ExecutorError::InvalidLimit { limit: 0 };
        assert!(err.to_string().contains("positive"));
        assert!(err.to_string().contains('0'));
    }

    #[test]
    fn test_double_completion_message() {
        let err = CompletionError::DoubleCompletion {
            key: TaskKey::Name("fetch".to_string()),
        };
        assert_eq!(err.to_string(), "completion signaled more than once for task fetch");
        assert_eq!(err.key(), &TaskKey::Name("fetch".to_string()));
    }

    #[test]
    fn test_run_error_accessors() {
        let err: RunError<String> = RunError::Task("boom".to_string());
        assert!(!err.is_abandoned());
        assert_eq!(err.to_string(), "task failed: boom");
        assert_eq!(err.into_task_error(), Some("boom".to_string()));

        let err: RunError<String> = RunError::Abandoned;
        assert!(err.is_abandoned());
        assert_eq!(err.into_task_error(), None);
    }
}
