//! Task - a caller-supplied unit of asynchronous work

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::guard::Completion;

type Invoke<T, E, C> = Box<dyn FnOnce(Option<Arc<C>>, Completion<T, E>) -> BoxFuture<'static, ()> + Send>;

/// A unit of work invoked once with an optional context and its completion signal
///
/// The future returned by the task body is spawned by the scheduler. The task
/// reports its outcome through the [`Completion`] it was handed, which may
/// happen before, during or after that future resolves.
pub struct Task<T, E, C = ()> {
    invoke: Invoke<T, E, C>,
}

impl<T, E> Task<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a task whose body ignores the calling context
    pub fn new<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Completion<T, E>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            invoke: Box::new(move |_context, done| body(done).boxed()),
        }
    }

    /// Create a task that signals the single value (or error) its future resolves to
    pub fn from_future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(move |done| async move {
            done.complete(fut.await.map(|value| vec![value]));
        })
    }

    /// Create a task that signals every value its future resolves to
    pub fn from_future_many<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<Vec<T>, E>> + Send + 'static,
    {
        Self::new(move |done| async move {
            done.complete(fut.await);
        })
    }
}

impl<T, E, C> Task<T, E, C>
where
    T: Send + 'static,
    E: Send + 'static,
    C: Send + Sync + 'static,
{
    /// Create a task whose body receives the calling context
    ///
    /// Every task of one invocation must share the context type; use this
    /// constructor for all of them when a context is supplied.
    pub fn with_context<F, Fut>(body: F) -> Self
    where
        F: FnOnce(Option<Arc<C>>, Completion<T, E>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            invoke: Box::new(move |context, done| body(context, done).boxed()),
        }
    }

    /// Run the task body, returning the future the scheduler spawns
    pub(crate) fn invoke(self, context: Option<Arc<C>>, done: Completion<T, E>) -> BoxFuture<'static, ()> {
        (self.invoke)(context, done)
    }
}

impl<T, E, C> std::fmt::Debug for Task<T, E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}
