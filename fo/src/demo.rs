//! Delay-based demo tasks
//!
//! Each value task sleeps `value * unit`, appends its value to a shared
//! completion log and succeeds with `value * 2`. Used by `fo run` to show
//! admission and completion order under different limits.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use eyre::{Result, eyre};
use thiserror::Error;
use tracing::debug;

use crate::collection::TaskCollection;
use crate::config::DemoConfig;
use crate::task::Task;

/// Values in the order their tasks completed
#[derive(Debug, Clone, Default)]
pub struct CompletionLog {
    entries: Arc<Mutex<Vec<u64>>>,
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, value: u64) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).push(value);
    }

    pub fn snapshot(&self) -> Vec<u64> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Error produced by an injected failing task
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DemoError {
    #[error("task at position {position} failed on purpose")]
    Injected { position: usize },
}

/// Delay of `value` units of `unit_ms` milliseconds
pub fn scaled_delay(unit_ms: u64, value: u64) -> Result<Duration> {
    unit_ms
        .checked_mul(value)
        .map(Duration::from_millis)
        .ok_or_else(|| eyre!("delay of {} units of {}ms overflows", value, unit_ms))
}

/// Sleep `delay`, log `value`, succeed with `value * 2`
pub fn delay_task(value: u64, delay: Duration, log: CompletionLog) -> Task<u64, DemoError> {
    Task::new(move |done| async move {
        tokio::time::sleep(delay).await;
        log.push(value);
        done.ok(value.saturating_mul(2));
    })
}

/// Sleep `delay`, log `value`, succeed with the pair `(value, value)`
pub fn tuple_task(value: u64, delay: Duration, log: CompletionLog) -> Task<u64, DemoError> {
    Task::new(move |done| async move {
        tokio::time::sleep(delay).await;
        log.push(value);
        done.ok_values(vec![value, value]);
    })
}

/// Fail after `delay` without logging
pub fn failing_task(position: usize, delay: Duration) -> Task<u64, DemoError> {
    Task::new(move |done| async move {
        tokio::time::sleep(delay).await;
        done.fail(DemoError::Injected { position });
    })
}

/// Description of a demo task set
#[derive(Debug, Clone, Default)]
pub struct DemoPlan {
    /// One delay task per value
    pub values: Vec<u64>,

    /// Splice a failing task in at this position
    pub fail_at: Option<usize>,

    /// Append a task yielding `(v, v)` after `v` units
    pub tuple: Option<u64>,

    /// Turn the sequence into a mapping with these keys (one per task)
    pub keys: Option<Vec<String>>,
}

impl DemoPlan {
    /// Total number of tasks the plan produces
    pub fn task_count(&self) -> usize {
        self.values.len() + usize::from(self.fail_at.is_some()) + usize::from(self.tuple.is_some())
    }

    /// Build the task collection, logging completions to `log`
    pub fn build(&self, config: &DemoConfig, log: &CompletionLog) -> Result<TaskCollection<u64, DemoError>> {
        debug!(plan = ?self, "DemoPlan::build: called");
        if let Some(keys) = &self.keys
            && keys.len() != self.task_count()
        {
            return Err(eyre!("{} keys given for {} tasks", keys.len(), self.task_count()));
        }

        let mut tasks = Vec::with_capacity(self.task_count());
        for &value in &self.values {
            if value.checked_mul(2).is_none() {
                return Err(eyre!("value {} is too large to double", value));
            }
            tasks.push(delay_task(value, scaled_delay(config.unit_ms, value)?, log.clone()));
        }

        if let Some(position) = self.fail_at {
            if position > tasks.len() {
                return Err(eyre!(
                    "fail-at position {} is past the end of {} tasks",
                    position,
                    tasks.len()
                ));
            }
            tasks.insert(position, failing_task(position, Duration::from_millis(config.fail_after_ms)));
        }

        if let Some(value) = self.tuple {
            tasks.push(tuple_task(value, scaled_delay(config.unit_ms, value)?, log.clone()));
        }

        match &self.keys {
            None => Ok(TaskCollection::sequence(tasks)),
            Some(keys) => Ok(keys.iter().cloned().zip(tasks).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Shape, TaskKey};

    #[test]
    fn test_task_count() {
        let plan = DemoPlan {
            values: vec![1, 2, 3],
            fail_at: Some(1),
            tuple: Some(5),
            keys: None,
        };
        assert_eq!(plan.task_count(), 5);
    }

    #[test]
    fn test_build_sequence() {
        let plan = DemoPlan {
            values: vec![1, 3],
            tuple: Some(5),
            ..Default::default()
        };
        let tasks = plan.build(&DemoConfig::default(), &CompletionLog::new()).unwrap();
        assert_eq!(tasks.shape(), Shape::Sequence);
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn test_build_mapping() {
        let plan = DemoPlan {
            values: vec![4, 2],
            keys: Some(vec!["a".to_string(), "b".to_string()]),
            ..Default::default()
        };
        let tasks = plan.build(&DemoConfig::default(), &CompletionLog::new()).unwrap();
        assert_eq!(tasks.shape(), Shape::Mapping);
        assert_eq!(tasks.keys().cloned().collect::<Vec<_>>(), vec![TaskKey::from("a"), TaskKey::from("b")]);
    }

    #[test]
    fn test_build_rejects_key_count_mismatch() {
        let plan = DemoPlan {
            values: vec![4, 2],
            keys: Some(vec!["a".to_string()]),
            ..Default::default()
        };
        assert!(plan.build(&DemoConfig::default(), &CompletionLog::new()).is_err());
    }

    #[test]
    fn test_build_rejects_fail_position_past_end() {
        let plan = DemoPlan {
            values: vec![1],
            fail_at: Some(3),
            ..Default::default()
        };
        assert!(plan.build(&DemoConfig::default(), &CompletionLog::new()).is_err());
    }

    #[test]
    fn test_scaled_delay_keeps_large_values() {
        let value = (1u64 << 32) + 1;
        assert_eq!(scaled_delay(1, value).unwrap(), Duration::from_millis(value));
        assert_eq!(scaled_delay(10, 3).unwrap(), Duration::from_millis(30));
    }

    #[test]
    fn test_scaled_delay_overflow_is_an_error() {
        assert!(scaled_delay(u64::MAX, 2).is_err());
        assert!(scaled_delay(u64::MAX, 1).is_ok());
    }

    #[test]
    fn test_build_rejects_overflowing_delay() {
        let config = DemoConfig {
            unit_ms: u64::MAX / 2,
            ..Default::default()
        };
        let plan = DemoPlan {
            values: vec![3],
            ..Default::default()
        };
        let err = plan.build(&config, &CompletionLog::new()).unwrap_err();
        assert!(err.to_string().contains("overflows"));

        let huge = DemoPlan {
            values: vec![u64::MAX],
            ..Default::default()
        };
        let unit = DemoConfig {
            unit_ms: 1,
            ..Default::default()
        };
        assert!(huge.build(&unit, &CompletionLog::new()).is_err());

        let tuple_plan = DemoPlan {
            tuple: Some(3),
            ..Default::default()
        };
        assert!(tuple_plan.build(&config, &CompletionLog::new()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_task_sleeps_full_delay() {
        let value = (1u64 << 32) + 1;
        let log = CompletionLog::new();
        let delay = scaled_delay(1, value).unwrap();
        let tasks: Vec<Task<u64, DemoError>> = vec![delay_task(value, delay, log.clone())];

        let start = tokio::time::Instant::now();
        let results = crate::scheduler::Executor::new(Default::default())
            .run_all(tasks, None)
            .unwrap()
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_millis(value));
        assert_eq!(log.snapshot(), vec![value]);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_completion_log_snapshot() {
        let log = CompletionLog::new();
        let other = log.clone();
        log.push(1);
        other.push(2);
        assert_eq!(log.snapshot(), vec![1, 2]);
    }
}
