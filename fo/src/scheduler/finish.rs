//! Final callback delivery

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::RunError;
use crate::results::Results;

/// Caller-supplied completion handler for callback-style dispatch
pub type FinishFn<T, E> = Box<dyn FnOnce(Result<Results<T>, E>) + Send + 'static>;

/// Invokes the caller's handler, if any
///
/// The scheduler's finished latch guarantees `fire` is reached once per run.
pub(crate) struct FinalCallback<T, E> {
    handler: Option<FinishFn<T, E>>,
}

impl<T, E> FinalCallback<T, E> {
    pub(crate) fn new(handler: Option<FinishFn<T, E>>) -> Self {
        Self { handler }
    }

    pub(crate) fn fire(self, outcome: Result<Results<T>, E>) {
        if let Some(handler) = self.handler {
            handler(outcome);
        }
    }
}

/// Future resolving to the outcome of one run
///
/// Dropping the handle does not cancel the run.
#[derive(Debug)]
pub struct RunHandle<T, E> {
    run_id: Uuid,
    rx: oneshot::Receiver<Result<Results<T>, E>>,
}

impl<T, E> RunHandle<T, E> {
    pub(crate) fn new(run_id: Uuid, rx: oneshot::Receiver<Result<Results<T>, E>>) -> Self {
        Self { run_id, rx }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
}

impl<T, E> Future for RunHandle<T, E> {
    type Output = Result<Results<T>, RunError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| match received {
            Ok(Ok(results)) => Ok(results),
            Ok(Err(err)) => Err(RunError::Task(err)),
            // Sender dropped without firing: no task can ever finish the run
            Err(_) => Err(RunError::Abandoned),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_fire_without_handler_is_noop() {
        let callback: FinalCallback<u32, String> = FinalCallback::new(None);
        callback.fire(Err("ignored".to_string()));
    }

    #[test]
    fn test_fire_invokes_handler() {
        let seen = Arc::new(Mutex::new(None));
        let slot = seen.clone();
        let callback: FinalCallback<u32, String> = FinalCallback::new(Some(Box::new(move |outcome| {
            *slot.lock().unwrap() = Some(outcome);
        })));

        callback.fire(Ok(Results::Sequence(Vec::new())));
        assert_eq!(*seen.lock().unwrap(), Some(Ok(Results::Sequence(Vec::new()))));
    }

    #[tokio::test]
    async fn test_handle_maps_outcomes() {
        let (tx, rx) = oneshot::channel();
        let handle: RunHandle<u32, String> = RunHandle::new(Uuid::now_v7(), rx);
        tx.send(Err("boom".to_string())).unwrap();
        assert_eq!(handle.await, Err(RunError::Task("boom".to_string())));

        let (tx, rx) = oneshot::channel::<Result<Results<u32>, String>>();
        let handle = RunHandle::new(Uuid::now_v7(), rx);
        drop(tx);
        assert_eq!(handle.await, Err(RunError::Abandoned));
    }
}
