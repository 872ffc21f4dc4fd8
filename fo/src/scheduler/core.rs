//! Executor and per-run scheduler implementation

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::collection::{Shape, TaskCollection, TaskKey};
use crate::error::ExecutorError;
use crate::events::{EventBus, EventEmitter, RunStats};
use crate::guard::{Completion, ErrorReporter, OutcomeSink, TracingReporter};
use crate::results::{Aggregator, Results};
use crate::task::Task;

use super::config::ExecutorConfig;
use super::finish::{FinalCallback, FinishFn, RunHandle};

/// The Executor fans out keyed collections of tasks, either all at once or
/// under a concurrency limit, and collects their results.
///
/// Each `dispatch_*`/`run_*` call is an independent invocation with its own
/// scheduler state; nothing is shared between invocations except the
/// reporter and event bus.
pub struct Executor {
    config: ExecutorConfig,
    reporter: Arc<dyn ErrorReporter>,
    events: Option<Arc<EventBus>>,
}

impl Executor {
    /// Create a new executor with the given configuration
    pub fn new(config: ExecutorConfig) -> Self {
        debug!(?config, "Executor::new: called");
        Self {
            config,
            reporter: Arc::new(TracingReporter),
            events: None,
        }
    }

    /// Route completion contract violations to `reporter`
    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        debug!("Executor::with_reporter: called");
        self.reporter = reporter;
        self
    }

    /// Emit run activity on `bus`
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        debug!("Executor::with_event_bus: called");
        self.events = Some(bus);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run every task at once; `on_finish` fires exactly once
    pub fn dispatch_all<T, E, C>(
        &self,
        tasks: impl Into<TaskCollection<T, E, C>>,
        context: Option<Arc<C>>,
        on_finish: Option<FinishFn<T, E>>,
    ) -> Result<Uuid, ExecutorError>
    where
        T: Send + 'static,
        E: Send + 'static,
        C: Send + Sync + 'static,
    {
        let tasks = tasks.into();
        let limit = tasks.len().max(1);
        debug!(total = tasks.len(), "Executor::dispatch_all: called");
        self.dispatch(tasks, limit, context, FinalCallback::new(on_finish))
    }

    /// Run tasks with at most `limit` in flight; `on_finish` fires exactly once
    pub fn dispatch_limited<T, E, C>(
        &self,
        tasks: impl Into<TaskCollection<T, E, C>>,
        limit: usize,
        context: Option<Arc<C>>,
        on_finish: Option<FinishFn<T, E>>,
    ) -> Result<Uuid, ExecutorError>
    where
        T: Send + 'static,
        E: Send + 'static,
        C: Send + Sync + 'static,
    {
        debug!(limit, "Executor::dispatch_limited: called");
        if limit == 0 {
            debug!("Executor::dispatch_limited: zero limit, rejecting");
            return Err(ExecutorError::InvalidLimit { limit });
        }
        self.dispatch(tasks.into(), limit, context, FinalCallback::new(on_finish))
    }

    /// Future-style [`dispatch_all`](Self::dispatch_all)
    pub fn run_all<T, E, C>(
        &self,
        tasks: impl Into<TaskCollection<T, E, C>>,
        context: Option<Arc<C>>,
    ) -> Result<RunHandle<T, E>, ExecutorError>
    where
        T: Send + 'static,
        E: Send + 'static,
        C: Send + Sync + 'static,
    {
        let (on_finish, rx) = oneshot_finish();
        let run_id = self.dispatch_all(tasks, context, Some(on_finish))?;
        Ok(RunHandle::new(run_id, rx))
    }

    /// Future-style [`dispatch_limited`](Self::dispatch_limited)
    pub fn run_limited<T, E, C>(
        &self,
        tasks: impl Into<TaskCollection<T, E, C>>,
        limit: usize,
        context: Option<Arc<C>>,
    ) -> Result<RunHandle<T, E>, ExecutorError>
    where
        T: Send + 'static,
        E: Send + 'static,
        C: Send + Sync + 'static,
    {
        let (on_finish, rx) = oneshot_finish();
        let run_id = self.dispatch_limited(tasks, limit, context, Some(on_finish))?;
        Ok(RunHandle::new(run_id, rx))
    }

    /// [`run_limited`](Self::run_limited) with the configured default limit
    pub fn run_bounded<T, E, C>(
        &self,
        tasks: impl Into<TaskCollection<T, E, C>>,
        context: Option<Arc<C>>,
    ) -> Result<RunHandle<T, E>, ExecutorError>
    where
        T: Send + 'static,
        E: Send + 'static,
        C: Send + Sync + 'static,
    {
        self.run_limited(tasks, self.config.default_limit, context)
    }

    fn dispatch<T, E, C>(
        &self,
        tasks: TaskCollection<T, E, C>,
        limit: usize,
        context: Option<Arc<C>>,
        finisher: FinalCallback<T, E>,
    ) -> Result<Uuid, ExecutorError>
    where
        T: Send + 'static,
        E: Send + 'static,
        C: Send + Sync + 'static,
    {
        let run_id = Uuid::now_v7();
        let (shape, entries) = tasks.into_parts();
        let total = entries.len();
        debug!(%run_id, %shape, total, limit, "Executor::dispatch: called");

        if entries.is_empty() {
            info!(%run_id, %shape, "Nothing to run, finishing immediately");
            let emitter = self.emitter(run_id);
            if let Some(emitter) = &emitter {
                emitter.run_started(shape, 0, limit);
            }
            finisher.fire(Ok(Results::empty(shape)));
            if let Some(emitter) = &emitter {
                emitter.run_finished(true, None, RunStats::default());
            }
            return Ok(run_id);
        }

        let runtime = Handle::try_current().map_err(|_| ExecutorError::NoRuntime)?;
        let emitter = self.emitter(run_id);
        if let Some(emitter) = &emitter {
            emitter.run_started(shape, total, limit);
        }

        let keys: Vec<TaskKey> = entries.iter().map(|(key, _)| key.clone()).collect();
        let pending = entries
            .into_iter()
            .enumerate()
            .map(|(index, (_, task))| (index, task))
            .collect();

        let run = Arc::new(Run {
            id: run_id,
            limit,
            shape,
            keys: keys.clone(),
            context,
            runtime,
            reporter: self.reporter.clone(),
            emitter,
            state: Mutex::new(RunState {
                pending,
                in_flight: 0,
                finished: false,
                pumping: false,
                failed_key: None,
                results: Some(Aggregator::new(shape, keys)),
                finisher: Some(finisher),
                stats: RunStats {
                    total,
                    ..Default::default()
                },
            }),
        });

        info!(%run_id, total, limit, "Run started");
        run.pump();
        Ok(run_id)
    }

    fn emitter(&self, run_id: Uuid) -> Option<EventEmitter> {
        self.events.as_ref().map(|bus| bus.emitter_for(run_id.to_string()))
    }
}

fn oneshot_finish<T, E>() -> (FinishFn<T, E>, oneshot::Receiver<Result<Results<T>, E>>)
where
    T: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let on_finish: FinishFn<T, E> = Box::new(move |outcome| {
        // Receiver may have been dropped; the run finishes regardless
        let _ = tx.send(outcome);
    });
    (on_finish, rx)
}

/// Mutable scheduler state for one run
struct RunState<T, E, C> {
    /// Tasks not yet admitted, in admission order
    pending: VecDeque<(usize, Task<T, E, C>)>,

    /// Admitted tasks whose completion has not been signalled
    in_flight: usize,

    /// Set once, when the final callback is claimed
    finished: bool,

    /// Held by the single caller currently admitting tasks
    pumping: bool,

    /// Key of the first failed task
    failed_key: Option<TaskKey>,

    results: Option<Aggregator<T>>,
    finisher: Option<FinalCallback<T, E>>,
    stats: RunStats,
}

/// What a delivered outcome resolved to, acted on after the lock is released
enum Step<T, E> {
    Discarded {
        failed_key: Option<TaskKey>,
    },
    Continue,
    Finish {
        finisher: Option<FinalCallback<T, E>>,
        outcome: Result<Results<T>, E>,
        failed_key: Option<TaskKey>,
        stats: RunStats,
    },
}

/// One invocation: admission, outcome routing and completion
struct Run<T, E, C> {
    id: Uuid,
    limit: usize,
    shape: Shape,
    keys: Vec<TaskKey>,
    context: Option<Arc<C>>,
    runtime: Handle,
    reporter: Arc<dyn ErrorReporter>,
    emitter: Option<EventEmitter>,
    state: Mutex<RunState<T, E, C>>,
}

impl<T, E, C> Run<T, E, C>
where
    T: Send + 'static,
    E: Send + 'static,
    C: Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, RunState<T, E, C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit pending tasks in order while slots are free
    ///
    /// The lock is released before each task is invoked, so a task may signal
    /// completion synchronously and re-enter here. Only one caller admits at a
    /// time: a re-entrant or concurrent call returns at once and the active
    /// loop picks up the slot it freed.
    fn pump(self: &Arc<Self>) {
        {
            let mut state = self.lock();
            if state.pumping {
                return;
            }
            state.pumping = true;
        }

        loop {
            let (index, task, in_flight) = {
                let mut state = self.lock();
                let next = if state.finished || state.in_flight >= self.limit {
                    None
                } else {
                    state.pending.pop_front()
                };
                let Some((index, task)) = next else {
                    state.pumping = false;
                    return;
                };
                state.in_flight += 1;
                state.stats.admitted += 1;
                state.stats.peak_in_flight = state.stats.peak_in_flight.max(state.in_flight);
                (index, task, state.in_flight)
            };
            self.admit(index, task, in_flight);
        }
    }

    fn admit(self: &Arc<Self>, index: usize, task: Task<T, E, C>, in_flight: usize) {
        let key = self.keys[index].clone();
        debug!(run_id = %self.id, %key, in_flight, "Run::admit: invoking task");
        if let Some(emitter) = &self.emitter {
            emitter.task_admitted(&key, in_flight);
        }

        let sink: Arc<dyn OutcomeSink<T, E>> = self.clone();
        let done = Completion::new(index, key, sink, self.reporter.clone());
        let body = task.invoke(self.context.clone(), done);
        self.runtime.spawn(body);
    }

    fn route(&self, index: usize, outcome: Result<Vec<T>, E>) -> Step<T, E> {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);

        if state.finished {
            state.stats.discarded += 1;
            return Step::Discarded {
                failed_key: state.failed_key.clone(),
            };
        }

        match outcome {
            Err(err) => {
                let key = self.keys[index].clone();
                state.finished = true;
                state.failed_key = Some(key.clone());
                state.pending.clear();
                Step::Finish {
                    finisher: state.finisher.take(),
                    outcome: Err(err),
                    failed_key: Some(key),
                    stats: state.stats.clone(),
                }
            }
            Ok(values) => {
                if let Some(results) = state.results.as_mut() {
                    results.record(index, values);
                }
                state.stats.completed += 1;
                if state.stats.completed < state.stats.total {
                    return Step::Continue;
                }
                state.finished = true;
                let results = state
                    .results
                    .take()
                    .map_or_else(|| Results::empty(self.shape), Aggregator::finish);
                Step::Finish {
                    finisher: state.finisher.take(),
                    outcome: Ok(results),
                    failed_key: None,
                    stats: state.stats.clone(),
                }
            }
        }
    }
}

impl<T, E, C> OutcomeSink<T, E> for Run<T, E, C>
where
    T: Send + 'static,
    E: Send + 'static,
    C: Send + Sync + 'static,
{
    fn deliver(self: Arc<Self>, index: usize, outcome: Result<Vec<T>, E>) {
        let key = &self.keys[index];
        let success = outcome.is_ok();
        debug!(run_id = %self.id, %key, success, "Run::deliver: called");

        match self.route(index, outcome) {
            Step::Discarded { failed_key } => {
                debug!(run_id = %self.id, %key, success, ?failed_key, "Run already finished, discarding outcome");
                if let Some(emitter) = &self.emitter {
                    emitter.outcome_discarded(key, success);
                }
            }
            Step::Continue => {
                if let Some(emitter) = &self.emitter {
                    emitter.task_completed(key, success);
                }
                self.pump();
            }
            Step::Finish {
                finisher,
                outcome,
                failed_key,
                stats,
            } => {
                if let Some(emitter) = &self.emitter {
                    emitter.task_completed(key, success);
                }
                match &failed_key {
                    Some(failed) => warn!(run_id = %self.id, key = %failed, "Run failed, remaining outcomes will be discarded"),
                    None => info!(run_id = %self.id, completed = stats.completed, "Run completed"),
                }
                if let Some(finisher) = finisher {
                    finisher.fire(outcome);
                }
                if let Some(emitter) = &self.emitter {
                    emitter.run_finished(failed_key.is_none(), failed_key, stats);
                }
            }
        }
    }
}

impl<T, E, C> Drop for Run<T, E, C> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !state.finished {
            warn!(
                run_id = %self.id,
                in_flight = state.in_flight,
                pending = state.pending.len(),
                "Run dropped before finishing; a task never signaled completion"
            );
        }
    }
}
