//! Deferred task definitions
//!
//! A [`Task`] wraps a zero-argument factory that starts an asynchronous
//! operation when invoked. Nothing runs until the executor dispatches it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future produced by a task factory
pub type TaskFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

pub(crate) type TaskFactory<T, E> = Box<dyn FnOnce() -> TaskFuture<T, E> + Send + 'static>;

enum TaskKind<T, E> {
    Runnable(TaskFactory<T, E>),
    Malformed(String),
}

/// A deferred unit of work handed to the executor
pub struct Task<T, E> {
    kind: TaskKind<T, E>,
}

impl<T, E> Task<T, E> {
    /// Create a task from a factory closure
    ///
    /// The closure is called at most once, when a worker dispatches the task.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            kind: TaskKind::Runnable(Box::new(move || Box::pin(factory()) as TaskFuture<T, E>)),
        }
    }

    /// Create an entry that cannot be invoked
    ///
    /// Dispatching it fails the whole run with
    /// [`RunError::MalformedTask`](crate::error::RunError::MalformedTask).
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self {
            kind: TaskKind::Malformed(reason.into()),
        }
    }

    /// Whether this entry can be invoked
    pub fn is_runnable(&self) -> bool {
        matches!(self.kind, TaskKind::Runnable(_))
    }

    /// Split into the factory, or the reason the entry cannot run
    pub(crate) fn into_factory(self) -> Result<TaskFactory<T, E>, String> {
        match self.kind {
            TaskKind::Runnable(factory) => Ok(factory),
            TaskKind::Malformed(reason) => Err(reason),
        }
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TaskKind::Runnable(_) => f.write_str("Task(<factory>)"),
            TaskKind::Malformed(reason) => write!(f, "Task(malformed: {})", reason),
        }
    }
}
